use std::cmp::Reverse;

use tracing::debug;

use crate::models::{Group, Placement, RankedArticle, ScoredArticle};

/// Annotate articles with their group and put them in digest order.
///
/// Groups are applied in order and each assignment overwrites any earlier one,
/// so an article claimed by two groups ends up in the later group. Positions
/// outside `articles` are skipped.
pub fn rank(articles: Vec<ScoredArticle>, groups: &[Group]) -> Vec<RankedArticle> {
    let mut placements = vec![Placement::Ungrouped; articles.len()];

    for (i, group) in groups.iter().enumerate() {
        let placement = Placement::Grouped {
            rank: i + 1,
            size: group.len(),
        };
        for &idx in &group.members {
            match placements.get_mut(idx) {
                Some(slot) => *slot = placement,
                None => debug!("Ignoring out-of-range index {} in group_{}", idx, i + 1),
            }
        }
    }

    let mut ranked: Vec<RankedArticle> = articles
        .into_iter()
        .zip(placements)
        .map(|(article, placement)| RankedArticle { article, placement })
        .collect();

    sort_ranked(&mut ranked);
    ranked
}

/// Group rank first (ungrouped last), then score descending. Stable.
pub fn sort_ranked(ranked: &mut [RankedArticle]) {
    ranked.sort_by_key(|r| (group_rank(&r.placement), Reverse(r.score())));
}

fn group_rank(placement: &Placement) -> usize {
    match placement {
        Placement::Grouped { rank, .. } => *rank,
        Placement::Ungrouped => usize::MAX,
    }
}
