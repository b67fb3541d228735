//! Reversible URL encoding of the active filter selection
//!
//! The wire format is the one stable external surface of the engine:
//! facet groups joined with `/`, tokens within a group joined with `-`,
//! and literal `-` or `/` inside a token escaped with a leading backslash.
//! Bookmarked URLs depend on these rules, so changing them is a
//! compatibility break.
//!
//! Decoding is defensive: malformed fragments degrade to "fewer active
//! filters", never to an error, because stale or hand-edited URLs must
//! still render a page.
//!
//! Backslash itself is not escaped, so a token that ends in a literal
//! backslash runs into the following separator on decode and the
//! round-trip is lossy for that token. Closing this would mean escaping
//! `\` as `\\`, which changes the encoding of every label containing a
//! backslash and breaks existing bookmarks.

use crate::models::{Facet, FacetFilter, FacetKind, FilterValue};

/// Active selection as an ordered facet-label to value-list map.
///
/// Order matters: serialization emits groups in insertion order, so the
/// round-trip law holds structurally, not just up to reordering. Range
/// facets store their single selection as a `[unit, from, to]` triple.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetFilterMap(Vec<(String, Vec<String>)>);

impl FacetFilterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, values)| values.as_slice())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Append a value to a facet's list, creating the entry if absent.
    /// Duplicate values are ignored.
    pub fn push_value(&mut self, label: &str, value: &str) {
        match self.0.iter_mut().find(|(name, _)| name == label) {
            Some((_, values)) => {
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
            None => self.0.push((label.to_string(), vec![value.to_string()])),
        }
    }

    /// Replace a facet's entire value list.
    pub fn set_values(&mut self, label: &str, values: Vec<String>) {
        match self.0.iter_mut().find(|(name, _)| name == label) {
            Some((_, existing)) => *existing = values,
            None => self.0.push((label.to_string(), values)),
        }
    }

    /// Remove one value from a facet's list, dropping the entry entirely
    /// when the list becomes empty.
    pub fn remove_value(&mut self, label: &str, value: &str) {
        if let Some(pos) = self.0.iter().position(|(name, _)| name == label) {
            self.0[pos].1.retain(|v| v != value);
            if self.0[pos].1.is_empty() {
                self.0.remove(pos);
            }
        }
    }

    pub fn remove(&mut self, label: &str) {
        self.0.retain(|(name, _)| name != label);
    }
}

impl FromIterator<(String, Vec<String>)> for FacetFilterMap {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Escape literal separators in a token.
fn escape(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    for c in token.chars() {
        if c == '-' || c == '/' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split on an unescaped separator. Escape sequences are either resolved
/// (`unescape` true, the innermost pass) or carried through verbatim for
/// the next pass. A trailing or stray backslash is kept literal.
fn split_unescaped(input: &str, sep: char, unescape: bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some(&next) if next == '-' || next == '/' => {
                    if !unescape {
                        current.push('\\');
                    }
                    current.push(next);
                    chars.next();
                }
                _ => current.push('\\'),
            }
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// Encode a facet-filter map into a URL fragment. Facets with an empty
/// value list are omitted.
pub fn serialize(map: &FacetFilterMap) -> String {
    let groups: Vec<String> = map
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(label, values)| {
            let mut tokens = vec![escape(label)];
            tokens.extend(values.iter().map(|v| escape(v)));
            tokens.join("-")
        })
        .collect();
    groups.join("/")
}

/// Decode a URL fragment. Groups without at least a label and one value
/// are dropped; this never fails on user-supplied input.
pub fn unserialize(fragment: &str) -> FacetFilterMap {
    let mut map = FacetFilterMap::new();
    for group in split_unescaped(fragment, '/', false) {
        if group.is_empty() {
            continue;
        }
        let mut tokens = split_unescaped(&group, '-', true).into_iter();
        let Some(label) = tokens.next() else {
            continue;
        };
        let values: Vec<String> = tokens.collect();
        if label.is_empty() || values.is_empty() {
            continue;
        }
        for value in values {
            map.push_value(&label, &value);
        }
    }
    map
}

/// Derive the active selection straight from computed facets, so the
/// current state never depends on keeping the original URL string around.
pub fn active_facet_filters(facets: &[Facet]) -> FacetFilterMap {
    let mut map = FacetFilterMap::new();
    for facet in facets {
        for filter in facet.active_filters() {
            match &filter.value {
                FilterValue::Label(label) => map.push_value(&facet.label, label),
                FilterValue::Range { unit, from, to } => {
                    map.set_values(
                        &facet.label,
                        vec![unit.clone(), format_number(*from), format_number(*to)],
                    );
                }
            }
        }
    }
    map
}

/// Selection after adding `filter` to `facet`. Range facets hold a single
/// selection, so the new `[unit, from, to]` triple replaces any existing
/// entry, clamped to the facet's configured bounds. Single-selection
/// discrete facets (radio widgets) also replace; multi-selection facets
/// accumulate.
pub fn add_filter_to_map(current: &FacetFilterMap, facet: &Facet, filter: &FacetFilter) -> FacetFilterMap {
    let mut next = current.clone();
    match (&facet.kind, &filter.value) {
        (FacetKind::Range { min, max, .. }, FilterValue::Range { unit, from, to }) => {
            let from = from.max(*min);
            let to = to.min(*max);
            next.set_values(
                &facet.label,
                vec![unit.clone(), format_number(from), format_number(to)],
            );
        }
        (_, FilterValue::Range { unit, from, to }) => {
            next.set_values(
                &facet.label,
                vec![unit.clone(), format_number(*from), format_number(*to)],
            );
        }
        (_, FilterValue::Label(label)) => {
            if facet.multiple_selection_allowed {
                next.push_value(&facet.label, label);
            } else {
                next.set_values(&facet.label, vec![label.clone()]);
            }
        }
    }
    next
}

/// Selection after removing `filter` from `facet`. Range facets drop
/// their whole entry; discrete facets drop one value, and the facet
/// entry disappears when its value list empties.
pub fn remove_filter_from_map(
    current: &FacetFilterMap,
    facet: &Facet,
    filter: &FacetFilter,
) -> FacetFilterMap {
    let mut next = current.clone();
    match &filter.value {
        FilterValue::Range { .. } => next.remove(&facet.label),
        FilterValue::Label(label) => next.remove_value(&facet.label, label),
    }
    next
}

/// Render a number without a trailing `.0` for whole values, so encoded
/// fragments read `Price-€-7-9` rather than `Price-€-7.0-9.0`.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FacetType, WidgetType};

    fn map(entries: &[(&str, &[&str])]) -> FacetFilterMap {
        entries
            .iter()
            .map(|(label, values)| {
                (
                    label.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    fn discrete_facet(label: &str, multiple: bool) -> Facet {
        Facet {
            label: label.to_string(),
            facet_type: FacetType::Category,
            displayed: true,
            multiple_selection_allowed: multiple,
            widget_type: if multiple {
                WidgetType::Checkbox
            } else {
                WidgetType::Radio
            },
            kind: FacetKind::Discrete,
            filters: Vec::new(),
        }
    }

    fn label_filter(label: &str, active: bool) -> FacetFilter {
        FacetFilter {
            label: label.to_string(),
            active,
            displayed: true,
            magnitude: 0,
            value: FilterValue::Label(label.to_string()),
            next_encoded: String::new(),
        }
    }

    #[test]
    fn test_serialize_discrete_group() {
        let m = map(&[("Categories", &["Tops", "Robes"])]);
        assert_eq!(serialize(&m), "Categories-Tops-Robes");
    }

    #[test]
    fn test_serialize_range_group() {
        let m = map(&[("Price", &["€", "7", "9"])]);
        assert_eq!(serialize(&m), "Price-€-7-9");
    }

    #[test]
    fn test_serialize_multiple_groups_ordered() {
        let m = map(&[("Categories", &["Tops"]), ("Color", &["Red", "Blue"])]);
        assert_eq!(serialize(&m), "Categories-Tops/Color-Red-Blue");
    }

    #[test]
    fn test_round_trip_plain() {
        let m = map(&[("Categories", &["Tops", "Robes"]), ("Price", &["€", "7", "9"])]);
        assert_eq!(unserialize(&serialize(&m)), m);
    }

    #[test]
    fn test_round_trip_separators_in_labels() {
        let m = map(&[
            ("Composition-Blend", &["Cotton/Linen", "90/10"]),
            ("Categories", &["Men / Women \\ -Children"]),
        ]);
        let encoded = serialize(&m);
        assert_eq!(unserialize(&encoded), m);
    }

    #[test]
    fn test_escaping_is_visible_in_fragment() {
        let m = map(&[("Size", &["S-M"])]);
        assert_eq!(serialize(&m), "Size-S\\-M");
    }

    #[test]
    fn test_unserialize_ignores_malformed_groups() {
        // Empty group, value-less group, stray trailing separator.
        let m = unserialize("/Categories-Tops//Color/");
        assert_eq!(m, map(&[("Categories", &["Tops"])]));
    }

    #[test]
    fn test_unserialize_keeps_stray_backslash() {
        let m = unserialize("Categories-a\\b");
        assert_eq!(m, map(&[("Categories", &["a\\b"])]));
    }

    /// Known wire-format limit: a token ending in `\` absorbs the next
    /// separator on decode, merging with the following token.
    #[test]
    fn test_token_ending_in_backslash_merges_on_decode() {
        let m = map(&[("Categories", &["a\\", "b"])]);
        assert_eq!(serialize(&m), "Categories-a\\-b");
        assert_eq!(unserialize("Categories-a\\-b"), map(&[("Categories", &["a-b"])]));
    }

    #[test]
    fn test_unserialize_empty_fragment() {
        assert!(unserialize("").is_empty());
    }

    #[test]
    fn test_add_accumulates_on_checkbox_facet() {
        let current = map(&[("Categories", &["Tops"])]);
        let facet = discrete_facet("Categories", true);
        let next = add_filter_to_map(&current, &facet, &label_filter("Robes", false));
        assert_eq!(next, map(&[("Categories", &["Tops", "Robes"])]));
    }

    #[test]
    fn test_add_replaces_on_radio_facet() {
        let current = map(&[("Condition", &["new"])]);
        let facet = discrete_facet("Condition", false);
        let next = add_filter_to_map(&current, &facet, &label_filter("used", false));
        assert_eq!(next, map(&[("Condition", &["used"])]));
    }

    #[test]
    fn test_add_range_replaces_and_clamps() {
        let current = map(&[("Price", &["€", "10", "20"])]);
        let facet = Facet {
            label: "Price".to_string(),
            facet_type: FacetType::Price,
            displayed: true,
            multiple_selection_allowed: false,
            widget_type: WidgetType::Slider,
            kind: FacetKind::Range {
                unit: "€".to_string(),
                min: 5.0,
                max: 50.0,
            },
            filters: Vec::new(),
        };
        let filter = FacetFilter {
            label: "€ 1 - 90".to_string(),
            active: false,
            displayed: true,
            magnitude: 0,
            value: FilterValue::Range {
                unit: "€".to_string(),
                from: 1.0,
                to: 90.0,
            },
            next_encoded: String::new(),
        };
        let next = add_filter_to_map(&current, &facet, &filter);
        assert_eq!(next, map(&[("Price", &["€", "5", "50"])]));
    }

    #[test]
    fn test_remove_last_filter_yields_empty_map() {
        let current = map(&[("Categories", &["Tops"])]);
        let facet = discrete_facet("Categories", true);
        let next = remove_filter_from_map(&current, &facet, &label_filter("Tops", true));
        assert!(next.is_empty());
    }

    #[test]
    fn test_remove_keeps_other_values() {
        let current = map(&[("Categories", &["Tops", "Robes"]), ("Color", &["Red"])]);
        let facet = discrete_facet("Categories", true);
        let next = remove_filter_from_map(&current, &facet, &label_filter("Robes", true));
        assert_eq!(next, map(&[("Categories", &["Tops"]), ("Color", &["Red"])]));
    }

    #[test]
    fn test_active_facet_filters_from_facets() {
        let mut facet = discrete_facet("Categories", true);
        facet.filters = vec![label_filter("Tops", true), label_filter("Robes", false)];
        let m = active_facet_filters(&[facet]);
        assert_eq!(m, map(&[("Categories", &["Tops"])]));
    }

    #[test]
    fn test_format_number_drops_integral_fraction() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(7.5), "7.5");
    }
}
