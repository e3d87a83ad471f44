//! Dashboard statistics and the daily activity series.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::store::{Invitation, Registration, format_timestamp};

pub const DEFAULT_RANGE_DAYS: u32 = 14;
pub const MIN_RANGE_DAYS: u32 = 7;
pub const MAX_RANGE_DAYS: u32 = 60;

/// Number of inviters listed on the dashboard.
pub const TOP_INVITERS: usize = 5;

/// Parse the `days` query parameter.
///
/// Missing, empty or non-numeric values fall back to the default; numbers
/// are clamped to `MIN_RANGE_DAYS..=MAX_RANGE_DAYS` and fractions round up.
pub fn parse_range_days(raw: Option<&str>) -> u32 {
    let Some(value) = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
    else {
        return DEFAULT_RANGE_DAYS;
    };
    value
        .clamp(MIN_RANGE_DAYS as f64, MAX_RANGE_DAYS as f64)
        .ceil() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviterCount {
    pub name: String,
    pub count: usize,
}

/// Inviters with the most invitations, highest first. Ties keep the order
/// in which the inviters first appear.
pub fn top_inviters(invitations: &[Invitation], limit: usize) -> Vec<InviterCount> {
    let mut counts: Vec<InviterCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for inv in invitations {
        match index.get(inv.inviter_name.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(inv.inviter_name.as_str(), counts.len());
                counts.push(InviterCount {
                    name: inv.inviter_name.clone(),
                    count: 1,
                });
            }
        }
    }

    // sort_by is stable
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

/// Payload of the admin dashboard endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_registrations: usize,
    pub total_invitations: usize,
    pub top_inviters: Vec<InviterCount>,
    pub registrations: Vec<Registration>,
    pub invitations: Vec<Invitation>,
}

impl DashboardStats {
    pub fn build(registrations: Vec<Registration>, invitations: Vec<Invitation>) -> Self {
        Self {
            total_registrations: registrations.len(),
            total_invitations: invitations.len(),
            top_inviters: top_inviters(&invitations, TOP_INVITERS),
            registrations,
            invitations,
        }
    }
}

/// Activity for one UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyPoint {
    /// `YYYY-MM-DD`
    pub date: String,
    /// Short label such as `Jan 10`.
    pub label: String,
    pub registrations: usize,
    pub invitations: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsTotals {
    pub registrations: usize,
    pub invitations: usize,
}

/// Payload of the admin analytics endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub success: bool,
    pub range_days: u32,
    pub start_date: String,
    pub series: Vec<DailyPoint>,
    pub totals: AnalyticsTotals,
}

/// First day of a `days`-long window ending on (and including) `today`.
pub fn range_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
        .unwrap_or(today)
}

/// Midnight UTC at the start of the window, the lower bound for queries.
pub fn range_start_time(today: NaiveDate, days: u32) -> DateTime<Utc> {
    range_start(today, days).and_time(chrono::NaiveTime::MIN).and_utc()
}

/// Bucket creation times into one point per UTC day.
///
/// Times outside the window are ignored.
pub fn build_report(
    today: NaiveDate,
    days: u32,
    registration_times: &[DateTime<Utc>],
    invitation_times: &[DateTime<Utc>],
) -> AnalyticsReport {
    let start = range_start(today, days);
    let mut series: Vec<DailyPoint> = Vec::with_capacity(days as usize);
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();

    for (i, day) in start.iter_days().take(days as usize).enumerate() {
        index.insert(day, i);
        series.push(DailyPoint {
            date: day.format("%Y-%m-%d").to_string(),
            label: day.format("%b %-d").to_string(),
            registrations: 0,
            invitations: 0,
        });
    }

    for ts in registration_times {
        if let Some(&i) = index.get(&ts.date_naive()) {
            series[i].registrations += 1;
        }
    }
    for ts in invitation_times {
        if let Some(&i) = index.get(&ts.date_naive()) {
            series[i].invitations += 1;
        }
    }

    let totals = AnalyticsTotals {
        registrations: series.iter().map(|p| p.registrations).sum(),
        invitations: series.iter().map(|p| p.invitations).sum(),
    };

    AnalyticsReport {
        success: true,
        range_days: days,
        start_date: format_timestamp(range_start_time(today, days)),
        series,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InvitationStatus;
    use chrono::TimeZone;

    fn invitation(inviter: &str) -> Invitation {
        Invitation {
            id: format!("inv-{inviter}"),
            inviter_name: inviter.into(),
            invitee_name: "Guest".into(),
            invitee_phone: "0800".into(),
            invitee_email: None,
            location: String::new(),
            custom_message: String::new(),
            status: InvitationStatus::Sent,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_parse_range_days() {
        assert_eq!(parse_range_days(None), 14);
        assert_eq!(parse_range_days(Some("")), 14);
        assert_eq!(parse_range_days(Some("abc")), 14);
        assert_eq!(parse_range_days(Some("NaN")), 14);
        assert_eq!(parse_range_days(Some("3")), 7);
        assert_eq!(parse_range_days(Some("-5")), 7);
        assert_eq!(parse_range_days(Some("30")), 30);
        assert_eq!(parse_range_days(Some("365")), 60);
        assert_eq!(parse_range_days(Some("10.5")), 11);
    }

    #[test]
    fn test_top_inviters_ordering() {
        let invs: Vec<Invitation> = ["Ada", "Bola", "Bola", "Chidi", "Ada", "Bola", "Dayo", "Eze", "Femi"]
            .into_iter()
            .map(invitation)
            .collect();

        let top = top_inviters(&invs, 5);
        let names: Vec<(&str, usize)> = top.iter().map(|t| (t.name.as_str(), t.count)).collect();
        assert_eq!(
            names,
            vec![("Bola", 3), ("Ada", 2), ("Chidi", 1), ("Dayo", 1), ("Eze", 1)]
        );
    }

    #[test]
    fn test_dashboard_stats_totals() {
        let stats = DashboardStats::build(vec![], vec![invitation("Ada"), invitation("Ada")]);
        assert_eq!(stats.total_registrations, 0);
        assert_eq!(stats.total_invitations, 2);
        assert_eq!(stats.top_inviters, vec![InviterCount { name: "Ada".into(), count: 2 }]);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["totalInvitations"], 2);
        assert!(json["topInviters"].is_array());
    }

    #[test]
    fn test_range_start() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        assert_eq!(range_start(today, 7), NaiveDate::from_ymd_opt(2026, 2, 27).unwrap());
        assert_eq!(
            format_timestamp(range_start_time(today, 7)),
            "2026-02-27T00:00:00.000Z"
        );
    }

    #[test]
    fn test_build_report_buckets() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
        let regs = vec![
            Utc.with_ymd_and_hms(2026, 1, 14, 23, 59, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 14, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 8, 12, 0, 0).unwrap(),
            // outside the window
            Utc.with_ymd_and_hms(2026, 1, 7, 23, 59, 59).unwrap(),
            Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap(),
        ];
        let invs = vec![Utc.with_ymd_and_hms(2026, 1, 10, 9, 30, 0).unwrap()];

        let report = build_report(today, 7, &regs, &invs);
        assert!(report.success);
        assert_eq!(report.range_days, 7);
        assert_eq!(report.start_date, "2026-01-08T00:00:00.000Z");
        assert_eq!(report.series.len(), 7);

        let first = &report.series[0];
        assert_eq!(first.date, "2026-01-08");
        assert_eq!(first.label, "Jan 8");
        assert_eq!(first.registrations, 1);

        let last = report.series.last().unwrap();
        assert_eq!(last.date, "2026-01-14");
        assert_eq!(last.registrations, 2);

        assert_eq!(report.series[2].invitations, 1);
        assert_eq!(
            report.totals,
            AnalyticsTotals {
                registrations: 3,
                invitations: 1
            }
        );
    }

    #[test]
    fn test_report_json_shape() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 14).unwrap();
        let json = serde_json::to_value(build_report(today, 14, &[], &[])).unwrap();
        assert_eq!(json["rangeDays"], 14);
        assert_eq!(json["series"].as_array().unwrap().len(), 14);
        assert_eq!(json["totals"]["registrations"], 0);
        assert!(json.get("startDate").is_some());
    }
}
