use crate::Address;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};

/// A delegate eligible for election based on accumulated votes.
///
/// Candidates are owned by the list they belong to; the election filter
/// operates on clones so the raw, unattenuated list survives in state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Candidate {
    pub address: Address,
    pub votes: U256,
    pub reward_address: Address,
    /// Opaque registration payload, carried through elections untouched.
    #[serde(with = "serde_utils::hex_vec")]
    pub payload: Vec<u8>,
}

impl Candidate {
    pub fn new(address: Address, votes: U256, reward_address: Address) -> Self {
        Self {
            address,
            votes,
            reward_address,
            payload: Vec::new(),
        }
    }
}

/// An ordered sequence of candidates. The index of a candidate is its rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(transparent)]
#[ssz(struct_behaviour = "transparent")]
pub struct CandidateList(pub Vec<Candidate>);

impl CandidateList {
    pub fn addresses(&self) -> Vec<Address> {
        self.0.iter().map(|candidate| candidate.address).collect()
    }

    pub fn contains_address(&self, address: &Address) -> bool {
        self.0.iter().any(|candidate| candidate.address == *address)
    }
}

impl From<Vec<Candidate>> for CandidateList {
    fn from(candidates: Vec<Candidate>) -> Self {
        Self(candidates)
    }
}

impl std::ops::Deref for CandidateList {
    type Target = [Candidate];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ssz::{Decode, Encode};

    fn sample_list() -> CandidateList {
        vec![
            Candidate::new(
                Address::repeat_byte(0x11),
                U256::from(400u64),
                Address::repeat_byte(0xa1),
            ),
            Candidate {
                payload: vec![0xde, 0xad, 0xbe, 0xef],
                ..Candidate::new(
                    Address::repeat_byte(0x22),
                    U256::from(100u64),
                    Address::repeat_byte(0xa2),
                )
            },
        ]
        .into()
    }

    #[test]
    fn ssz_round_trip_preserves_order_and_payload() {
        let list = sample_list();
        let decoded = CandidateList::from_ssz_bytes(&list.as_ssz_bytes()).unwrap();
        assert_eq!(decoded, list);
        assert_eq!(decoded[0].address, Address::repeat_byte(0x11));
        assert_eq!(decoded[1].payload, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn serialization_is_deterministic() {
        let list = sample_list();
        assert_eq!(list.as_ssz_bytes(), list.clone().as_ssz_bytes());
    }

    #[test]
    fn json_round_trip() {
        let list = sample_list();
        let json = serde_json::to_string(&list).unwrap();
        assert_eq!(serde_json::from_str::<CandidateList>(&json).unwrap(), list);
    }
}
