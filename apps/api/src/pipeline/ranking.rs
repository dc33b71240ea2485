use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::capabilities::MatchScore;
use crate::models::{Posting, RankedMatch};

/// Joins scores to postings and assigns dense ranks 1..N.
///
/// Scores naming an unknown posting are dropped, a repeated jobId keeps its
/// first score, and scores are clamped into 0..=100. Order is descending
/// score, ties broken by ascending sequence id.
pub fn rank_matches(postings: &[Posting], scores: Vec<MatchScore>) -> Vec<RankedMatch> {
    let by_id: HashMap<u64, &Posting> = postings.iter().map(|p| (p.sequence_id, p)).collect();
    let mut used: HashSet<u64> = HashSet::new();

    let mut matches: Vec<RankedMatch> = Vec::with_capacity(scores.len());
    for score in scores {
        let Some(posting) = by_id.get(&score.job_id) else {
            debug!(job_id = score.job_id, "Dropping score for unknown posting");
            continue;
        };
        if !used.insert(score.job_id) {
            debug!(job_id = score.job_id, "Ignoring repeated score");
            continue;
        }
        matches.push(RankedMatch {
            posting: (*posting).clone(),
            score: clamp_score(score.match_score),
            strengths: score.strengths,
            weaknesses: score.weaknesses,
            missing_requirements: score.missing_requirements,
            recommendations: score.recommendations,
            rank: 0,
        });
    }

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then(a.posting.sequence_id.cmp(&b.posting.sequence_id))
    });
    for (i, m) in matches.iter_mut().enumerate() {
        m.rank = i as u32 + 1;
    }
    matches
}

fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        0.0
    } else {
        raw.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(id: u64) -> Posting {
        Posting {
            sequence_id: id,
            title: format!("Job {id}"),
            link: format!("https://example.com/{id}"),
            description: String::new(),
            company: None,
            location: None,
            date_posted: None,
        }
    }

    fn score(job_id: u64, value: f64) -> MatchScore {
        MatchScore {
            job_id,
            match_score: value,
            strengths: vec![format!("s{job_id}")],
            weaknesses: vec![],
            missing_requirements: vec![],
            recommendations: vec![],
        }
    }

    #[test]
    fn test_ranks_are_dense_and_ties_break_on_sequence_id() {
        let postings = vec![posting(1), posting(2), posting(3)];
        let ranked = rank_matches(&postings, vec![score(3, 70.0), score(1, 90.0), score(2, 70.0)]);
        let order: Vec<(u64, u32)> = ranked
            .iter()
            .map(|m| (m.posting.sequence_id, m.rank))
            .collect();
        assert_eq!(order, vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_unknown_job_id_is_dropped() {
        let postings = vec![posting(1), posting(2)];
        let ranked = rank_matches(&postings, vec![score(7, 95.0)]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_first_score_wins_for_repeated_job_id() {
        let postings = vec![posting(1)];
        let ranked = rank_matches(&postings, vec![score(1, 40.0), score(1, 99.0)]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].score, 40.0);
        assert_eq!(ranked[0].rank, 1);
    }

    #[test]
    fn test_scores_are_clamped() {
        let postings = vec![posting(1), posting(2), posting(3)];
        let ranked = rank_matches(
            &postings,
            vec![score(1, 140.0), score(2, -5.0), score(3, f64::NAN)],
        );
        assert_eq!(ranked[0].score, 100.0);
        assert_eq!(ranked[1].score, 0.0);
        assert_eq!(ranked[1].posting.sequence_id, 2);
        assert_eq!(ranked[2].score, 0.0);
    }

    #[test]
    fn test_details_follow_their_posting() {
        let postings = vec![posting(1), posting(2)];
        let ranked = rank_matches(&postings, vec![score(2, 50.0), score(1, 60.0)]);
        assert_eq!(ranked[0].strengths, vec!["s1"]);
        assert_eq!(ranked[1].strengths, vec!["s2"]);
    }
}
