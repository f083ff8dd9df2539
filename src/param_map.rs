//! Typed, paged key → value parameter store — the contract between an
//! effect's DSP core and whatever host or editor drives it.
//!
//! Grounded in `SoXEffectParameterMap` from the original source and spec
//! §4.4. Values are always stored as strings (so serialization is trivial
//! and host-side widgets only ever deal in text), but are validated and, for
//! `Real` parameters, reformatted to a fixed precision derived from the
//! declared step on every store.

use std::collections::{HashMap, HashSet};

/// The kind of a single parameter map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterKind {
    Real,
    Int,
    Enum,
    #[default]
    Unknown,
}

/// The validated range for a parameter, keyed by [`ParameterKind`].
#[derive(Debug, Clone)]
enum Range {
    Int { lo: i64, hi: i64, step: i64 },
    Real { lo: f64, hi: f64, step: f64 },
    Enum(Vec<String>),
}

/// Sentinel string returned by [`ParameterMap::value`] for a parameter that
/// has never been set (or was explicitly invalidated).
pub const UNKNOWN_VALUE: &str = "???";

/// The literal separator between the page index and the base parameter name
/// in the wire encoding `"<pageIndex>#<name>"`.
pub const WIDGET_PAGE_SEPARATOR: char = '#';

/// Nominal page index reserved for the page-selector parameter.
pub const SELECTOR_PAGE: i64 = -1;

/// Nominal page index reserved for the page-count parameter.
pub const PAGE_COUNTER_PAGE: i64 = -2;

/// A typed, paged, ordered key → value parameter map.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    name_list: Vec<String>,
    values: HashMap<String, String>,
    kinds: HashMap<String, ParameterKind>,
    ranges: HashMap<String, Range>,
    active: HashSet<String>,
}

fn fractional_digits_for_step(step: f64) -> i32 {
    (-step.log10()).round() as i32
}

fn format_real(value: f64, step: f64) -> String {
    let quantised = (value / step).round() * step;
    let digits = fractional_digits_for_step(step);
    if digits > 0 {
        format!("{:.*}", digits as usize, quantised)
    } else {
        format!("{}", quantised.round() as i64)
    }
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all entries (names, values, kinds, ranges, activeness).
    pub fn clear(&mut self) {
        self.name_list.clear();
        self.values.clear();
        self.kinds.clear();
        self.ranges.clear();
        self.active.clear();
    }

    fn add_to_name_list(&mut self, name: &str) {
        if !self.name_list.iter().any(|n| n == name) {
            self.name_list.push(name.to_string());
        }
        self.values.insert(name.to_string(), UNKNOWN_VALUE.to_string());
        self.active.insert(name.to_string());
    }

    /// Whether `name` occurs in this map.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// All parameter names, in insertion order.
    pub fn parameter_name_list(&self) -> &[String] {
        &self.name_list
    }

    /// A snapshot of every parameter name mapped to its current value
    /// string — the serialization format named in spec §6.
    pub fn parameter_name_to_value_map(&self) -> Vec<(String, String)> {
        self.name_list
            .iter()
            .filter(|n| self.kinds.get(*n).copied().unwrap_or_default() != ParameterKind::Unknown)
            .map(|n| (n.clone(), self.value(n)))
            .collect()
    }

    /// The kind of `name`, or [`ParameterKind::Unknown`] if not present.
    pub fn kind(&self, name: &str) -> ParameterKind {
        self.kinds.get(name).copied().unwrap_or_default()
    }

    /// Allowed enum values for `name`, or empty if not an enum parameter.
    pub fn value_range_enum(&self, name: &str) -> Vec<String> {
        match self.ranges.get(name) {
            Some(Range::Enum(values)) if self.kind(name) == ParameterKind::Enum => values.clone(),
            _ => Vec::new(),
        }
    }

    /// `(low, high, step)` for an Int parameter, or `(0, 0, 0)` if not one.
    pub fn value_range_int(&self, name: &str) -> (i64, i64, i64) {
        match self.ranges.get(name) {
            Some(Range::Int { lo, hi, step }) if self.kind(name) == ParameterKind::Int => {
                (*lo, *hi, *step)
            }
            _ => (0, 0, 0),
        }
    }

    /// `(low, high, step)` for a Real parameter, or `(0, 0, 0)` if not one.
    pub fn value_range_real(&self, name: &str) -> (f64, f64, f64) {
        match self.ranges.get(name) {
            Some(Range::Real { lo, hi, step }) if self.kind(name) == ParameterKind::Real => {
                (*lo, *hi, *step)
            }
            _ => (0.0, 0.0, 0.0),
        }
    }

    /// Whether `value` parses and lies within range for `name`'s kind.
    pub fn is_allowed_value(&self, name: &str, value: &str) -> bool {
        if !self.name_list.iter().any(|n| n == name) {
            return false;
        }

        match self.kind(name) {
            ParameterKind::Int => match value.parse::<i64>() {
                Ok(v) => {
                    let (lo, hi, step) = self.value_range_int(name);
                    lo <= v && v <= hi && step != 0 && (v - lo) % step == 0
                }
                Err(_) => false,
            },
            ParameterKind::Real => match value.parse::<f64>() {
                Ok(v) => {
                    let (lo, hi, _) = self.value_range_real(name);
                    lo <= v && v <= hi
                }
                Err(_) => false,
            },
            ParameterKind::Enum => self.value_range_enum(name).iter().any(|v| v == value),
            ParameterKind::Unknown => false,
        }
    }

    /// Whether `value` differs from the stored value for `name`. Real
    /// parameters compare by magnitude against `step`; everything else
    /// compares as strings.
    pub fn value_is_different(&self, name: &str, value: &str) -> bool {
        let stored = self.value(name);
        if self.kind(name) == ParameterKind::Real {
            let (_, _, step) = self.value_range_real(name);
            match (stored.parse::<f64>(), value.parse::<f64>()) {
                (Ok(s), Ok(v)) => (s - v).abs() >= step,
                _ => stored != value,
            }
        } else {
            stored != value
        }
    }

    /// Marks `name` active or inactive. New parameters start active.
    pub fn set_activeness(&mut self, name: &str, is_active: bool) {
        if is_active {
            self.active.insert(name.to_string());
        } else {
            self.active.remove(name);
        }
    }

    /// Whether `name` is currently active.
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// Batch [`Self::set_activeness`] over a list of names.
    pub fn set_activeness_for_name_list(&mut self, names: &[String], is_active: bool) {
        for name in names {
            self.set_activeness(name, is_active);
        }
    }

    /// Marks every parameter whose normalised page index is `<= last_page`
    /// active, and every later page inactive.
    pub fn change_activeness_by_page(&mut self, last_page: i64) {
        let names: Vec<String> = self.name_list.clone();
        for name in names {
            let (_, page_index, _) = Self::split_parameter_name(&name);
            self.set_activeness(&name, page_index <= last_page);
        }
    }

    /// Stores `value` for `name` if it passes [`Self::is_allowed_value`];
    /// silently ignored otherwise. Real values are quantised to `step` and
    /// reformatted to `round(-log10(step))` fractional digits.
    pub fn set_value(&mut self, name: &str, value: &str) {
        if !self.is_allowed_value(name, value) {
            log::trace!("parameter map: rejected {name:?} = {value:?}");
            return;
        }
        let stored = if self.kind(name) == ParameterKind::Real {
            let (_, _, step) = self.value_range_real(name);
            let v: f64 = value.parse().unwrap_or(0.0);
            format_real(v, step)
        } else {
            value.to_string()
        };
        self.values.insert(name.to_string(), stored);
    }

    /// Resets `name`'s stored value to the unknown-value sentinel.
    pub fn invalidate_value(&mut self, name: &str) {
        if self.name_list.iter().any(|n| n == name) {
            self.values.insert(name.to_string(), UNKNOWN_VALUE.to_string());
        }
    }

    /// The stored value for `name`, or the unknown-value sentinel.
    pub fn value(&self, name: &str) -> String {
        self.values
            .get(name)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_VALUE.to_string())
    }

    /// Defines an Int parameter, initialised to `lo`.
    ///
    /// # Panics
    /// Panics if `lo > hi` or `step == 0` — these are programmer errors
    /// (interval setup), not recoverable validation failures.
    pub fn set_kind_int(&mut self, name: &str, lo: i64, hi: i64, step: i64) {
        assert!(lo <= hi, "interval must be non-empty");
        assert!(step != 0, "step must be non-zero");
        self.add_to_name_list(name);
        self.kinds.insert(name.to_string(), ParameterKind::Int);
        self.ranges.insert(name.to_string(), Range::Int { lo, hi, step });
        self.set_value(name, &lo.to_string());
    }

    /// [`Self::set_kind_int`] followed by [`Self::set_value`].
    pub fn set_kind_and_value_int(&mut self, name: &str, lo: i64, hi: i64, step: i64, value: i64) {
        self.set_kind_int(name, lo, hi, step);
        self.set_value(name, &value.to_string());
    }

    /// Defines a Real parameter, initialised to `lo`.
    ///
    /// # Panics
    /// Panics if `lo > hi` or `step <= 0`.
    pub fn set_kind_real(&mut self, name: &str, lo: f64, hi: f64, step: f64) {
        assert!(lo <= hi, "interval must be non-empty");
        assert!(step > 1e-9, "step must be greater than zero");
        self.add_to_name_list(name);
        self.kinds.insert(name.to_string(), ParameterKind::Real);
        self.ranges.insert(name.to_string(), Range::Real { lo, hi, step });
        self.set_value(name, &format!("{lo}"));
    }

    /// [`Self::set_kind_real`] followed by [`Self::set_value`].
    pub fn set_kind_and_value_real(&mut self, name: &str, lo: f64, hi: f64, step: f64, value: f64) {
        self.set_kind_real(name, lo, hi, step);
        self.set_value(name, &format!("{value}"));
    }

    /// Defines an Enum parameter with allowed `values`, initialised to
    /// `values[0]`.
    ///
    /// # Panics
    /// Panics if `values` is empty.
    pub fn set_kind_enum(&mut self, name: &str, values: &[String]) {
        assert!(!values.is_empty(), "value list must be non-empty");
        self.add_to_name_list(name);
        self.kinds.insert(name.to_string(), ParameterKind::Enum);
        self.ranges.insert(name.to_string(), Range::Enum(values.to_vec()));
        self.set_value(name, &values[0]);
    }

    /// [`Self::set_kind_enum`] followed by [`Self::set_value`].
    pub fn set_kind_and_value_enum(&mut self, name: &str, values: &[String], value: &str) {
        self.set_kind_enum(name, values);
        self.set_value(name, value);
    }

    /// Encodes `"<page_index>#<name>"`.
    pub fn paged_parameter_name(name: &str, page_index: i64) -> String {
        format!("{page_index}{WIDGET_PAGE_SEPARATOR}{name}")
    }

    /// Splits a (possibly paged) parameter name into `(base_name,
    /// normalised_page_index, nominal_page_index)`. Unpaged names (no `#`)
    /// default to page `0`. The normalised index clamps negative sentinel
    /// pages (selector/counter) up to `0`; the nominal index preserves the
    /// original sign so callers can distinguish sentinels.
    pub fn split_parameter_name(name: &str) -> (String, i64, i64) {
        match name.find(WIDGET_PAGE_SEPARATOR) {
            None => (name.to_string(), 0, 0),
            Some(pos) => {
                let nominal: i64 = name[..pos].parse().unwrap_or(0);
                let base = name[pos + WIDGET_PAGE_SEPARATOR.len_utf8()..].to_string();
                (base, nominal.max(0), nominal)
            }
        }
    }

    /// Whether `name`'s nominal page index is the page-selector sentinel.
    pub fn is_page_selector(name: &str) -> bool {
        let (_, _, nominal) = Self::split_parameter_name(name);
        nominal == SELECTOR_PAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_parameter_round_trips_within_range() {
        let mut map = ParameterMap::new();
        map.set_kind_int("Pole Count", 1, 2, 1);
        map.set_value("Pole Count", "2");
        assert_eq!(map.value("Pole Count"), "2");
        let v: i64 = map.value("Pole Count").parse().unwrap();
        assert_eq!((v - 1) % 1, 0);
    }

    #[test]
    fn out_of_range_int_is_rejected() {
        let mut map = ParameterMap::new();
        map.set_kind_int("Pole Count", 1, 2, 1);
        map.set_value("Pole Count", "5");
        assert_eq!(map.value("Pole Count"), "1");
    }

    #[test]
    fn real_parameter_formats_to_step_precision() {
        let mut map = ParameterMap::new();
        map.set_kind_real("Frequency [Hz]", 10.0, 20000.0, 0.01);
        map.set_value("Frequency [Hz]", "1000.005");
        assert_eq!(map.value("Frequency [Hz]"), "1000.01");
    }

    #[test]
    fn enum_parameter_rejects_unknown_values() {
        let mut map = ParameterMap::new();
        let values = vec!["Yes".to_string(), "No".to_string()];
        map.set_kind_enum("Is Wet Only?", &values);
        map.set_value("Is Wet Only?", "Maybe");
        assert_eq!(map.value("Is Wet Only?"), "Yes");
        map.set_value("Is Wet Only?", "No");
        assert_eq!(map.value("Is Wet Only?"), "No");
    }

    #[test]
    fn value_is_different_respects_real_step() {
        let mut map = ParameterMap::new();
        map.set_kind_real("Gain [dB]", -25.0, 25.0, 0.01);
        map.set_value("Gain [dB]", "0.0");
        assert!(!map.value_is_different("Gain [dB]", "0.005"));
        assert!(map.value_is_different("Gain [dB]", "0.02"));
    }

    #[test]
    fn no_change_when_value_is_not_different() {
        let mut map = ParameterMap::new();
        map.set_kind_real("Gain [dB]", -25.0, 25.0, 0.01);
        map.set_value("Gain [dB]", "1.0");
        let stored_before = map.value("Gain [dB]");
        assert!(!map.value_is_different("Gain [dB]", "1.000001"));
        map.set_value("Gain [dB]", "1.000001");
        assert_eq!(map.value("Gain [dB]"), stored_before);
    }

    #[test]
    fn paged_name_round_trips() {
        let name = ParameterMap::paged_parameter_name("Delay [ms]", 3);
        assert_eq!(name, "3#Delay [ms]");
        let (base, page, nominal) = ParameterMap::split_parameter_name(&name);
        assert_eq!(base, "Delay [ms]");
        assert_eq!(page, 3);
        assert_eq!(nominal, 3);
    }

    #[test]
    fn unpaged_name_defaults_to_page_zero() {
        let (base, page, nominal) = ParameterMap::split_parameter_name("Gain [dB]");
        assert_eq!(base, "Gain [dB]");
        assert_eq!(page, 0);
        assert_eq!(nominal, 0);
    }

    #[test]
    fn selector_and_counter_pages_are_recognised() {
        let selector = ParameterMap::paged_parameter_name("Stage", SELECTOR_PAGE);
        let counter = ParameterMap::paged_parameter_name("Stage Count", PAGE_COUNTER_PAGE);
        assert!(ParameterMap::is_page_selector(&selector));
        assert!(!ParameterMap::is_page_selector(&counter));
        let (_, page, nominal) = ParameterMap::split_parameter_name(&counter);
        assert_eq!(page, 0);
        assert_eq!(nominal, PAGE_COUNTER_PAGE);
    }

    #[test]
    fn change_activeness_by_page_deactivates_later_pages() {
        let mut map = ParameterMap::new();
        map.set_kind_real(&ParameterMap::paged_parameter_name("Delay [ms]", 1), 0.0, 1.0, 0.01);
        map.set_kind_real(&ParameterMap::paged_parameter_name("Delay [ms]", 2), 0.0, 1.0, 0.01);
        map.change_activeness_by_page(1);
        assert!(map.is_active(&ParameterMap::paged_parameter_name("Delay [ms]", 1)));
        assert!(!map.is_active(&ParameterMap::paged_parameter_name("Delay [ms]", 2)));
    }

    #[test]
    fn unknown_parameter_has_unknown_kind_and_value() {
        let map = ParameterMap::new();
        assert_eq!(map.kind("nope"), ParameterKind::Unknown);
        assert_eq!(map.value("nope"), UNKNOWN_VALUE);
    }
}
