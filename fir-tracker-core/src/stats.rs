//! Dashboard statistics over a set of cases

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Case, CaseQuality, CaseStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityBreakdown {
    pub excellent: usize,
    pub good: usize,
    pub default: usize,
}

/// Headline counts for the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub on_track: usize,
    pub critical: usize,
    pub default: usize,
    /// Mean age of open cases, rounded to whole days
    pub avg_days: u32,
    pub quality: QualityBreakdown,
}

impl CaseStats {
    pub fn from_cases<'a, I>(cases: I) -> Self
    where
        I: IntoIterator<Item = &'a Case>,
    {
        let mut stats = CaseStats::default();
        let mut open_days: u64 = 0;

        for case in cases {
            stats.total += 1;
            if case.is_completed {
                stats.completed += 1;
                match case.quality {
                    CaseQuality::Excellent => stats.quality.excellent += 1,
                    CaseQuality::Good => stats.quality.good += 1,
                    CaseQuality::Default => stats.quality.default += 1,
                    CaseQuality::Pending => {}
                }
                continue;
            }

            stats.pending += 1;
            open_days += u64::from(case.days_elapsed);
            match case.status {
                CaseStatus::OnTrack => stats.on_track += 1,
                CaseStatus::Critical => stats.critical += 1,
                CaseStatus::Default => stats.default += 1,
                CaseStatus::Completed => {}
            }
        }

        if stats.pending > 0 {
            let mean = open_days as f64 / stats.pending as f64;
            stats.avg_days = mean.round() as u32;
        }
        stats
    }
}

/// Statistics for one group (a police station, a sub-division or an
/// investigating officer).
///
/// Unlike [`CaseStats`], `avg_days` here is the mean over every case in the
/// group, completed ones counted at their frozen age, rounded half to even.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub key: String,
    #[serde(flatten)]
    pub stats: CaseStats,
}

impl GroupStats {
    /// Group by police station, busiest (most pending) first
    pub fn by_station<'a, I>(cases: I) -> Vec<GroupStats>
    where
        I: IntoIterator<Item = &'a Case>,
    {
        by_pending(group_by(cases, |case| case.police_station.clone()))
    }

    /// Group one station's cases by investigating officer, busiest first
    pub fn by_io<'a, I>(cases: I, station: &str) -> Vec<GroupStats>
    where
        I: IntoIterator<Item = &'a Case>,
    {
        by_pending(group_by(
            cases.into_iter().filter(|case| case.police_station == station),
            |case| case.io_name.clone(),
        ))
    }

    /// Group by sub-division, ordered by name
    pub fn by_sub_division<'a, I>(cases: I) -> Vec<GroupStats>
    where
        I: IntoIterator<Item = &'a Case>,
    {
        group_by(cases, |case| case.sub_division.clone())
    }
}

/// Disposal quality across all cases
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub quality: QualityBreakdown,
}

impl PerformanceSummary {
    pub fn from_cases<'a, I>(cases: I) -> Self
    where
        I: IntoIterator<Item = &'a Case>,
    {
        let stats = CaseStats::from_cases(cases);
        Self {
            total: stats.total,
            completed: stats.completed,
            pending: stats.pending,
            quality: stats.quality,
        }
    }
}

fn group_by<'a, I, F>(cases: I, key: F) -> Vec<GroupStats>
where
    I: IntoIterator<Item = &'a Case>,
    F: Fn(&Case) -> String,
{
    let mut groups: BTreeMap<String, Vec<&Case>> = BTreeMap::new();
    for case in cases {
        groups.entry(key(case)).or_default().push(case);
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let total_days: u64 = members.iter().map(|c| u64::from(c.days_elapsed)).sum();
            let mean = total_days as f64 / members.len() as f64;
            let mut stats = CaseStats::from_cases(members);
            stats.avg_days = mean.round_ties_even() as u32;
            GroupStats { key, stats }
        })
        .collect()
}

// Stable, so equal counts keep name order.
fn by_pending(mut groups: Vec<GroupStats>) -> Vec<GroupStats> {
    groups.sort_by(|a, b| b.stats.pending.cmp(&a.stats.pending));
    groups
}
