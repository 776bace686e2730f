use crate::core::{DetectError, Transaction, TransactionSource};

/// Find the shield most likely to have funded `total_zat` of deshields.
///
/// The source returns candidates inside its tolerance band and lookback
/// window already ranked by amount closeness then recency; the ranking is
/// re-applied here so the tie-break policy holds for any source
/// implementation. At most one match is returned.
pub fn find_funding_match<S: TransactionSource>(
    source: &S,
    total_zat: u64,
    before_time: i64,
    tolerance_zat: u64,
) -> Result<Option<Transaction>, DetectError> {
    let mut candidates = source.fetch_funding_candidates(total_zat, before_time, tolerance_zat)?;
    candidates.sort_by(|a, b| {
        a.amount_zat
            .abs_diff(total_zat)
            .cmp(&b.amount_zat.abs_diff(total_zat))
            .then(b.time.cmp(&a.time))
    });
    Ok(candidates.into_iter().next())
}
