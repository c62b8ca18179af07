use crate::error::PollError;
use committee_shuffle::{rank_by_votes, sort_by_seeded_hash, PROTOCOL_SORT_SEED};
use log::warn;
use safe_arith::{ArithError, SafeArith};
use std::collections::BTreeMap;
use types::{Address, Blacklist, Candidate, CandidateList, Height, U256};

/// Attenuate blacklisted voting power and re-rank the list.
///
/// Every candidate is cloned; a blacklisted clone keeps
/// `votes * (100 - intensity_rate) / 100`, truncated toward zero, applied
/// once per address no matter how many strikes it carries. The output is
/// ordered by attenuated votes, with seed-keyed tie rotation per epoch.
pub fn filter_and_rank(
    candidates: &CandidateList,
    blacklist: &Blacklist,
    epoch_start_height: Height,
) -> Result<CandidateList, PollError> {
    let multiplier = U256::from(100u64.safe_sub(u64::from(blacklist.intensity_rate))?);

    let mut filtered: BTreeMap<Address, Candidate> = BTreeMap::new();
    let mut attenuated_votes: BTreeMap<Address, U256> = BTreeMap::new();
    for candidate in candidates {
        let mut candidate = candidate.clone();
        if blacklist.contains(&candidate.address) {
            candidate.votes = candidate
                .votes
                .checked_mul(multiplier)
                .ok_or(ArithError::Overflow)?
                / U256::from(100u64);
        }
        attenuated_votes.insert(candidate.address, candidate.votes);
        filtered.insert(candidate.address, candidate);
    }

    let ranked = rank_by_votes(
        &attenuated_votes,
        epoch_start_height.as_u64(),
        &PROTOCOL_SORT_SEED,
    );
    Ok(CandidateList(
        ranked
            .into_iter()
            .filter_map(|address| filtered.remove(&address))
            .collect(),
    ))
}

/// Top-ranked candidates eligible to produce blocks.
///
/// Zero-vote candidates are dropped outright and do not count against the
/// cap.
pub fn block_producers(ranked: &CandidateList, num_candidate_delegates: u64) -> CandidateList {
    let mut producers = Vec::new();
    for candidate in ranked {
        if producers.len() as u64 == num_candidate_delegates {
            break;
        }
        if candidate.votes.is_zero() {
            continue;
        }
        producers.push(candidate.clone());
    }
    CandidateList(producers)
}

/// The rotating committee for the epoch starting at `epoch_start_height`.
///
/// Producer addresses are shuffled by the seeded hash and the first
/// `num_delegates` keep their shuffled positions. A shorter-than-expected
/// committee is logged but served as-is.
pub fn active_block_producers(
    producers: &CandidateList,
    num_delegates: u64,
    epoch_start_height: Height,
) -> CandidateList {
    let mut addresses = producers.addresses();
    sort_by_seeded_hash(
        &mut addresses,
        epoch_start_height.as_u64(),
        &PROTOCOL_SORT_SEED,
    );
    if (addresses.len() as u64) < num_delegates {
        warn!(
            "only {} block producers for a committee of {} at height {}",
            addresses.len(),
            num_delegates,
            epoch_start_height
        );
    }
    let committee_size = std::cmp::min(num_delegates as usize, addresses.len());

    let by_address: BTreeMap<Address, &Candidate> = producers
        .iter()
        .map(|candidate| (candidate.address, candidate))
        .collect();
    CandidateList(
        addresses[..committee_size]
            .iter()
            .filter_map(|address| by_address.get(address).map(|candidate| (*candidate).clone()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_address, test_candidate};
    use ssz::Encode;

    #[test]
    fn attenuation_reorders_blacklisted_candidates() {
        let candidates: CandidateList = vec![test_candidate(1, 100), test_candidate(2, 40)].into();
        let mut blacklist = Blacklist::new(75);
        blacklist.add_strike(test_address(1));

        let ranked = filter_and_rank(&candidates, &blacklist, Height::new(361)).unwrap();

        // 100 * 25 / 100 = 25, so the clean 40-vote candidate leads.
        assert_eq!(ranked[0].address, test_address(2));
        assert_eq!(ranked[0].votes, U256::from(40u64));
        assert_eq!(ranked[1].address, test_address(1));
        assert_eq!(ranked[1].votes, U256::from(25u64));
    }

    #[test]
    fn attenuation_truncates_toward_zero() {
        let candidates: CandidateList = vec![test_candidate(1, 33)].into();
        let mut blacklist = Blacklist::new(50);
        blacklist.add_strike(test_address(1));

        let ranked = filter_and_rank(&candidates, &blacklist, Height::new(1)).unwrap();
        assert_eq!(ranked[0].votes, U256::from(16u64));
    }

    #[test]
    fn strike_count_does_not_compound_attenuation() {
        let candidates: CandidateList = vec![test_candidate(1, 100)].into();
        let mut blacklist = Blacklist::new(50);
        blacklist.add_strike(test_address(1));
        blacklist.add_strike(test_address(1));
        blacklist.add_strike(test_address(1));

        let ranked = filter_and_rank(&candidates, &blacklist, Height::new(1)).unwrap();
        assert_eq!(ranked[0].votes, U256::from(50u64));
    }

    #[test]
    fn zero_intensity_changes_nothing() {
        let candidates: CandidateList =
            vec![test_candidate(1, 100), test_candidate(2, 40), test_candidate(3, 7)].into();
        let mut blacklist = Blacklist::new(0);
        blacklist.add_strike(test_address(1));
        blacklist.add_strike(test_address(3));

        let clean = filter_and_rank(&candidates, &Blacklist::new(0), Height::new(361)).unwrap();
        let listed = filter_and_rank(&candidates, &blacklist, Height::new(361)).unwrap();

        assert_eq!(clean.as_ssz_bytes(), listed.as_ssz_bytes());
    }

    #[test]
    fn full_intensity_erases_voting_power() {
        let candidates: CandidateList = vec![test_candidate(1, 1_000_000)].into();
        let mut blacklist = Blacklist::new(100);
        blacklist.add_strike(test_address(1));

        let ranked = filter_and_rank(&candidates, &blacklist, Height::new(1)).unwrap();
        assert!(ranked[0].votes.is_zero());
        assert!(block_producers(&ranked, 10).is_empty());
    }

    #[test]
    fn filter_is_pure() {
        let candidates: CandidateList = (1..=12).map(|byte| test_candidate(byte, 100)).collect::<Vec<_>>().into();
        let mut blacklist = Blacklist::new(40);
        blacklist.add_strike(test_address(3));
        blacklist.add_strike(test_address(9));

        let first = filter_and_rank(&candidates, &blacklist, Height::new(721)).unwrap();
        let second = filter_and_rank(&candidates, &blacklist, Height::new(721)).unwrap();
        assert_eq!(first.as_ssz_bytes(), second.as_ssz_bytes());
    }

    #[test]
    fn zero_vote_candidates_are_skipped_not_counted() {
        let ranked: CandidateList = vec![
            test_candidate(1, 100),
            test_candidate(2, 0),
            test_candidate(3, 50),
            test_candidate(4, 10),
        ]
        .into();

        let producers = block_producers(&ranked, 3);
        assert_eq!(
            producers.addresses(),
            vec![test_address(1), test_address(3), test_address(4)]
        );
    }

    #[test]
    fn committee_selection_is_deterministic() {
        let producers: CandidateList =
            (1..=8).map(|byte| test_candidate(byte, 100 * byte as u64)).collect::<Vec<_>>().into();

        let first = active_block_producers(&producers, 5, Height::new(361));
        let second = active_block_producers(&producers, 5, Height::new(361));
        assert_eq!(first.as_ssz_bytes(), second.as_ssz_bytes());
        assert_eq!(first.len(), 5);

        for candidate in &first {
            assert!(producers.contains_address(&candidate.address));
        }
    }

    #[test]
    fn short_producer_list_yields_short_committee() {
        let producers: CandidateList = vec![test_candidate(1, 10), test_candidate(2, 20)].into();
        let committee = active_block_producers(&producers, 24, Height::new(1));
        assert_eq!(committee.len(), 2);
    }
}
