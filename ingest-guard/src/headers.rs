//! Header reconciliation: deriving one canonical column order per run.
//!
//! Observed headers come from the data itself (CSV header row, or the union
//! of JSON object keys). An authoritative ordering may come from an explicit
//! configuration list or from a structural validator's schema field list.
//! Every validator in a run shares the reconciled order.

/// Where the canonical column ordering comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderAuthority {
    /// No authoritative ordering; observed headers are used as-is.
    #[default]
    None,
    /// An explicit configured list, returned verbatim without merging.
    /// The caller guarantees the data actually fits these columns.
    Explicit(Vec<String>),
    /// Field names declared by a structural validator's schema document,
    /// used as a preference ordering and merged with observed headers.
    Schema(Vec<String>),
}

impl HeaderAuthority {
    /// True when an explicit list is configured.
    pub fn is_explicit(&self) -> bool {
        matches!(self, HeaderAuthority::Explicit(_))
    }
}

/// Produces the canonical column order for one validation run.
///
/// - `Explicit` authorities are returned verbatim.
/// - `Schema` authorities are merged: walk the schema list in order, moving
///   each name that appears in `observed` into the result; then append the
///   remaining observed headers in their original relative order, so columns
///   unknown to the schema are never dropped.
/// - With no authority, `observed` is returned unchanged.
///
/// Duplicate observed names are not defended: first occurrence wins during
/// removal.
pub fn reconcile(observed: &[String], authority: &HeaderAuthority) -> Vec<String> {
    match authority {
        HeaderAuthority::Explicit(list) => list.clone(),
        HeaderAuthority::None => observed.to_vec(),
        HeaderAuthority::Schema(preferred) => {
            if preferred == observed {
                return observed.to_vec();
            }
            let mut working: Vec<String> = observed.to_vec();
            let mut ordered = Vec::with_capacity(observed.len());
            for name in preferred {
                if let Some(pos) = working.iter().position(|h| h == name) {
                    ordered.push(working.remove(pos));
                }
            }
            // Headers the schema does not know about keep their observed order.
            ordered.extend(working);
            ordered
        }
    }
}
