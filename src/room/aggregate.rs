//! Aggregate ranking: a pure function folding every player's per-item ranks
//! into a final order.
//!
//! Each rank contributes `items_per_game + 1 - rank` points; a missing rank
//! contributes nothing. Items sort by total points descending, then average
//! rank ascending, then original submission order.

use crate::protocol::AggregateEntry;

use super::state::{Item, Player};

pub fn aggregate_ranks(
    items: &[Item],
    players: &[Player],
    items_per_game: u32,
) -> Vec<AggregateEntry> {
    let mut scored: Vec<(usize, AggregateEntry)> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let ranks: Vec<u32> = players
                .iter()
                .filter_map(|p| p.rankings.get(&item.id).copied())
                .collect();
            let total_points: u32 = ranks.iter().map(|&r| items_per_game + 1 - r).sum();
            // An item nobody ranked sorts behind everything with the worst
            // possible average.
            let average_rank = if ranks.is_empty() {
                f64::from(items_per_game + 1)
            } else {
                f64::from(ranks.iter().sum::<u32>()) / ranks.len() as f64
            };
            (
                index,
                AggregateEntry {
                    item_id: item.id,
                    text: item.text.clone(),
                    emoji: item.emoji.clone(),
                    total_points,
                    average_rank,
                    rank: 0,
                },
            )
        })
        .collect();

    scored.sort_by(|(ia, a), (ib, b)| {
        b.total_points
            .cmp(&a.total_points)
            .then(a.average_rank.total_cmp(&b.average_rank))
            .then(ia.cmp(ib))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(position, (_, mut entry))| {
            entry.rank = position as u32 + 1;
            entry
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    fn item(text: &str) -> Item {
        Item {
            id: Uuid::new_v4(),
            text: text.to_string(),
            emoji: "🍕".to_string(),
            submitted_by: Uuid::new_v4(),
            submitted_at: t0(),
        }
    }

    fn player(rankings: BTreeMap<Uuid, u32>) -> Player {
        Player {
            id: Uuid::new_v4(),
            nickname: "p".to_string(),
            connected: true,
            rankings,
            joined_at: t0(),
            catching_up: false,
        }
    }

    #[test]
    fn solo_game_orders_by_rank() {
        let x = item("x");
        let y = item("y");
        let rankings = BTreeMap::from([(x.id, 1), (y.id, 2)]);
        let result = aggregate_ranks(&[x.clone(), y.clone()], &[player(rankings)], 2);

        assert_eq!(result[0].item_id, x.id);
        assert_eq!(result[0].rank, 1);
        assert_eq!(result[0].total_points, 2);
        assert_eq!(result[1].item_id, y.id);
        assert_eq!(result[1].rank, 2);
        assert_eq!(result[1].total_points, 1);
    }

    #[test]
    fn missing_ranks_contribute_zero_points() {
        let x = item("x");
        let y = item("y");
        let p1 = player(BTreeMap::from([(x.id, 1)]));
        let p2 = player(BTreeMap::new());
        let result = aggregate_ranks(&[x.clone(), y.clone()], &[p1, p2], 5);

        let x_entry = result.iter().find(|e| e.item_id == x.id).unwrap();
        let y_entry = result.iter().find(|e| e.item_id == y.id).unwrap();
        assert_eq!(x_entry.total_points, 5);
        assert_eq!(y_entry.total_points, 0);
        assert_eq!(x_entry.rank, 1);
        assert_eq!(y_entry.rank, 2);
    }

    #[test]
    fn reversed_rankings_tie_and_fall_back_to_submission_order() {
        let a = item("a");
        let b = item("b");
        // Two players with perfectly reversed rankings: totals are equal and
        // so are averages, so submission order decides.
        let p1 = player(BTreeMap::from([(a.id, 1), (b.id, 2)]));
        let p2 = player(BTreeMap::from([(a.id, 2), (b.id, 1)]));
        let result = aggregate_ranks(&[a.clone(), b.clone()], &[p1, p2], 2);

        assert_eq!(result[0].total_points, result[1].total_points);
        assert_eq!(result[0].item_id, a.id, "earlier submission wins the tie");
        assert_eq!(result[1].item_id, b.id);
    }

    #[test]
    fn average_rank_breaks_point_ties_before_submission_order() {
        let a = item("a");
        let b = item("b");
        let c = item("c");
        // items_per_game = 3. b: one rank of 1 (3 points, avg 1.0);
        // a: two ranks of 2 and 3 (3 points, avg 2.5). Same points, b wins.
        let p1 = player(BTreeMap::from([(a.id, 2), (b.id, 1)]));
        let p2 = player(BTreeMap::from([(a.id, 3)]));
        let result = aggregate_ranks(&[a.clone(), b.clone(), c.clone()], &[p1, p2], 3);

        assert_eq!(result[0].item_id, b.id);
        assert_eq!(result[1].item_id, a.id);
        assert_eq!(result[0].total_points, result[1].total_points);
        assert_eq!(result[2].item_id, c.id, "unranked item is last");
    }

    #[test]
    fn ranks_are_dense_from_one() {
        let items: Vec<Item> = (0..4).map(|i| item(&format!("i{i}"))).collect();
        let rankings: BTreeMap<Uuid, u32> = items
            .iter()
            .enumerate()
            .map(|(i, it)| (it.id, i as u32 + 1))
            .collect();
        let result = aggregate_ranks(&items, &[player(rankings)], 4);
        let ranks: Vec<u32> = result.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    proptest! {
        /// Shuffling submission order never changes any item's total points
        /// or average rank; it only matters as the final tiebreak.
        #[test]
        fn totals_are_invariant_under_submission_order(
            ranks in proptest::collection::vec(1u32..=6, 6),
            rotation in 0usize..6,
        ) {
            let items: Vec<Item> = (0..6).map(|i| item(&format!("i{i}"))).collect();
            // One player ranking every item with an arbitrary (possibly
            // clashing across players, never within one) assignment built
            // from distinct slots.
            let mut used = std::collections::BTreeSet::new();
            let rankings: BTreeMap<Uuid, u32> = items
                .iter()
                .zip(ranks.iter())
                .filter_map(|(it, &r)| used.insert(r).then_some((it.id, r)))
                .collect();
            let players = vec![player(rankings)];

            let baseline = aggregate_ranks(&items, &players, 6);

            let mut rotated = items.clone();
            rotated.rotate_left(rotation);
            let shuffled = aggregate_ranks(&rotated, &players, 6);

            for entry in &baseline {
                let other = shuffled
                    .iter()
                    .find(|e| e.item_id == entry.item_id)
                    .expect("every item appears in both aggregates");
                prop_assert_eq!(other.total_points, entry.total_points);
                prop_assert_eq!(other.average_rank, entry.average_rank);
            }
        }
    }
}
