//! Numeric parameter lists shared by CSI and DCS headers
//!
//! `;` separates parameters and `:` separates sub-parameters. Empty fields
//! are kept as `None` so each command can apply its own default.

/// Largest value a parameter can take; bigger numbers saturate
pub const MAX_PARAM_VALUE: u32 = u16::MAX as u32;

/// Parsed parameter list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    /// Each group is a parameter followed by its sub-parameters
    groups: Vec<Vec<Option<u32>>>,
    /// Total fields seen, including sub-parameters
    fields: usize,
}

impl Params {
    /// Parse parameter bytes (`0-9`, `;`, `:`). Returns `None` for any
    /// other byte or when more than `max_fields` fields are present.
    pub fn parse(bytes: &[u8], max_fields: usize) -> Option<Self> {
        let mut params = Params::default();
        if bytes.is_empty() {
            return Some(params);
        }
        let mut group = Vec::new();
        let mut current: Option<u32> = None;
        for &b in bytes {
            match b {
                b'0'..=b'9' => {
                    let digit = u32::from(b - b'0');
                    let value = current.unwrap_or(0).saturating_mul(10).saturating_add(digit);
                    current = Some(value.min(MAX_PARAM_VALUE));
                }
                b':' => {
                    group.push(current.take());
                    params.fields += 1;
                }
                b';' => {
                    group.push(current.take());
                    params.fields += 1;
                    params.groups.push(std::mem::take(&mut group));
                }
                _ => return None,
            }
            if params.fields > max_fields {
                return None;
            }
        }
        group.push(current);
        params.fields += 1;
        params.groups.push(group);
        if params.fields > max_fields {
            return None;
        }
        Some(params)
    }

    /// Number of top-level parameters
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Parameter `i` as sent, `None` when missing or empty
    pub fn get(&self, i: usize) -> Option<u32> {
        self.groups.get(i).and_then(|g| g.first().copied().flatten())
    }

    /// Parameter `i`, with missing, empty and zero all meaning `default`
    pub fn get_or(&self, i: usize, default: u32) -> u32 {
        match self.get(i) {
            None | Some(0) => default,
            Some(v) => v,
        }
    }

    /// Parameter `i`, with missing and empty meaning `default` (zero kept)
    pub fn get_or_zero(&self, i: usize, default: u32) -> u32 {
        self.get(i).unwrap_or(default)
    }

    /// Parameter `i` with its sub-parameters
    pub fn group(&self, i: usize) -> &[Option<u32>] {
        self.groups.get(i).map_or(&[], Vec::as_slice)
    }

    /// Top-level values with empty fields as 0
    pub fn values(&self) -> Vec<u32> {
        self.groups
            .iter()
            .map(|g| g.first().copied().flatten().unwrap_or(0))
            .collect()
    }

    /// Top-level values as mode numbers, with empty fields skipped
    pub fn modes(&self) -> Vec<u16> {
        self.groups
            .iter()
            .filter_map(|g| g.first().copied().flatten())
            .map(|v| v as u16)
            .collect()
    }
}
