//! Leader election over ephemeral ballots.
//!
//! Each replica publishes an ephemeral vote at `indexes/{selfIndex}`
//! naming the index it votes for; the winner is the lowest index holding
//! a quorum of votes, with a replica's own vote for itself breaking ties
//! in its favor. This module is pure -- it only interprets an already-read
//! `{voter_index: voted_for_index}` map; reading and writing the ballots
//! themselves goes through [`ridgeline_coordination::CoordinationClient`]
//! in [`crate::controller::FleetController`].

use std::collections::BTreeMap;

/// The role a replica plays after running one election pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

/// Picks the election winner from a `{voter_index -> voted_for_index}`
/// ballot map.
///
/// Policy: among indices that hold a quorum of votes
/// (strictly more than half of `ensemble_size`), the winner is the lowest
/// such index; a replica's self-vote counts toward its own total like any
/// other. If no index reaches quorum, there is no winner yet.
pub fn elect_winner(votes: &BTreeMap<u16, u16>, ensemble_size: usize) -> Option<u16> {
    let mut tally: BTreeMap<u16, usize> = BTreeMap::new();
    for voted_for in votes.values() {
        *tally.entry(*voted_for).or_insert(0) += 1;
    }

    let quorum = ensemble_size / 2 + 1;
    tally
        .into_iter()
        .filter(|(_, count)| *count >= quorum)
        .map(|(candidate, _)| candidate)
        .min()
}

/// Runs one election pass for `self_index`, given the current ballot map
/// (which must already include `self_index`'s own vote) and the ensemble
/// size.
pub fn run_election(self_index: u16, votes: &BTreeMap<u16, u16>, ensemble_size: usize) -> (Option<u16>, Role) {
    let winner = elect_winner(votes, ensemble_size);
    let role = match winner {
        Some(w) if w == self_index => Role::Leader,
        _ => Role::Follower,
    };
    (winner, role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowest_index_with_quorum_wins() {
        let mut votes = BTreeMap::new();
        votes.insert(0, 0);
        votes.insert(1, 0);
        votes.insert(2, 2);
        let (winner, role) = run_election(0, &votes, 3);
        assert_eq!(winner, Some(0));
        assert_eq!(role, Role::Leader);
    }

    #[test]
    fn replica_not_voted_for_is_a_follower() {
        let mut votes = BTreeMap::new();
        votes.insert(0, 0);
        votes.insert(1, 0);
        votes.insert(2, 2);
        let (_, role) = run_election(2, &votes, 3);
        assert_eq!(role, Role::Follower);
    }

    #[test]
    fn no_winner_without_quorum() {
        let mut votes = BTreeMap::new();
        votes.insert(0, 0);
        votes.insert(1, 1);
        votes.insert(2, 2);
        assert_eq!(elect_winner(&votes, 3), None);
    }
}
