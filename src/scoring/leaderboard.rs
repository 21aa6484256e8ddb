//! Cohort leaderboards over quiz attempts.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::config::LeaderboardConfig;
use crate::scoring::filter::LeaderboardPeriod;
use crate::scoring::types::AttemptRecord;
use crate::scoring::{mean, round_dp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardKind {
    /// Same academic stream and year
    Stream,
    Subject,
}

/// A learner of the cohort with their completed attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortMember {
    pub user_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub total_points: u32,
    #[serde(default)]
    pub attempts: Vec<AttemptRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: Option<u32>,
    pub user_id: u64,
    pub name: String,
    pub avatar: Option<String>,
    pub average_score: f64,
    pub best_score: f64,
    pub total_attempts: u32,
    pub total_points: u32,
    pub is_current_user: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserStanding {
    pub rank: Option<u32>,
    pub entry: Option<LeaderboardEntry>,
    pub in_list: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaderboard {
    pub kind: LeaderboardKind,
    pub period: LeaderboardPeriod,
    pub podium: Vec<LeaderboardEntry>,
    pub rankings: Vec<LeaderboardEntry>,
    pub current_user: CurrentUserStanding,
    pub total_participants: usize,
}

pub fn empty_leaderboard(kind: LeaderboardKind, period: LeaderboardPeriod) -> Leaderboard {
    Leaderboard {
        kind,
        period,
        podium: Vec::new(),
        rankings: Vec::new(),
        current_user: CurrentUserStanding::default(),
        total_participants: 0,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LeaderboardRequest<'a> {
    pub kind: LeaderboardKind,
    pub period: LeaderboardPeriod,
    pub limit: usize,
    /// The requester with their full completed history, independent of the
    /// cohort and period
    pub current_user: &'a CohortMember,
    pub now: DateTime<Utc>,
}

struct Standing<'a> {
    member: &'a CohortMember,
    average: f64,
    best: f64,
    attempts: u32,
}

fn standing<'a>(member: &'a CohortMember, scores: &[f64]) -> Option<Standing<'a>> {
    if scores.is_empty() {
        return None;
    }
    Some(Standing {
        member,
        average: mean(scores),
        best: scores.iter().copied().fold(f64::MIN, f64::max),
        attempts: scores.len() as u32,
    })
}

fn display_name(member: &CohortMember, cfg: &LeaderboardConfig) -> String {
    match member.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("{} {}", cfg.anonymous_name_prefix, member.user_id),
    }
}

fn entry(standing: &Standing<'_>, rank: Option<u32>, current_user_id: u64, cfg: &LeaderboardConfig) -> LeaderboardEntry {
    LeaderboardEntry {
        rank,
        user_id: standing.member.user_id,
        name: display_name(standing.member, cfg),
        avatar: standing.member.avatar.clone(),
        average_score: round_dp(standing.average, 1),
        best_score: round_dp(standing.best, 1),
        total_attempts: standing.attempts,
        total_points: standing.member.total_points,
        is_current_user: standing.member.user_id == current_user_id,
    }
}

/// Ranks members by mean score, then attempt count, then user id. Members
/// without an attempt in the period are left out.
pub fn build_leaderboard(
    members: &[CohortMember],
    request: &LeaderboardRequest<'_>,
    cfg: &LeaderboardConfig,
) -> Leaderboard {
    let window = request.period.window();
    let current_id = request.current_user.user_id;

    let mut standings: Vec<Standing<'_>> = members
        .iter()
        .filter_map(|member| {
            let scores: Vec<f64> = member
                .attempts
                .iter()
                .filter(|a| window.contains(a.completed_at, request.now))
                .map(|a| a.score_percentage)
                .collect();
            standing(member, &scores)
        })
        .collect();

    standings.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.attempts.cmp(&a.attempts))
            .then_with(|| a.member.user_id.cmp(&b.member.user_id))
    });
    standings.truncate(request.limit);

    let rankings: Vec<LeaderboardEntry> = standings
        .iter()
        .enumerate()
        .map(|(idx, s)| entry(s, Some(idx as u32 + 1), current_id, cfg))
        .collect();

    let listed = rankings.iter().find(|e| e.user_id == current_id).cloned();
    let current_user = match listed {
        Some(found) => CurrentUserStanding {
            rank: found.rank,
            entry: Some(found),
            in_list: true,
        },
        None => {
            let scores: Vec<f64> = request
                .current_user
                .attempts
                .iter()
                .map(|a| a.score_percentage)
                .collect();
            CurrentUserStanding {
                rank: None,
                entry: standing(request.current_user, &scores).map(|s| entry(&s, None, current_id, cfg)),
                in_list: false,
            }
        }
    };

    let podium = rankings.iter().take(cfg.podium_size).cloned().collect();
    let total_participants = rankings.len();

    Leaderboard {
        kind: request.kind,
        period: request.period,
        podium,
        rankings,
        current_user,
        total_participants,
    }
}
