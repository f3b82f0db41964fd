//! Worked scenarios: flat baseline lift, weighted split, zero-weight split,
//! below-baseline days, baseline window boundaries, contamination policy,
//! duplicate metric rows, and dates at the edge of the calendar.

use chrono::NaiveDate;
use uplift_core::{
    activity::{Activity, ActivityStatus, ActivityType, DailyMetric, MetricKind},
    attribution::{SplitMode, WeightSource},
    baseline::baseline_window,
    confidence::Confidence,
    config::{AttributionConfig, BaselinePolicy},
    report::{compute_all_reports, UpliftReport},
};

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
}

fn activity(id: &str, channel: &str, date: NaiveDate) -> Activity {
    Activity {
        id: id.into(),
        activity_type: ActivityType::NewsletterSend,
        channel: channel.into(),
        partner_name: "Partner".into(),
        date,
        status: ActivityStatus::Published,
        cost_usd: None,
        deterministic_clicks: None,
        actual_clicks: None,
        deterministic_tracked_signups: None,
        metadata: None,
        content_url: None,
        channel_url: None,
        notes: None,
    }
}

fn metric(channel: &str, date: NaiveDate, signups: i64, activations: i64) -> DailyMetric {
    DailyMetric { date, channel: channel.into(), signups, activations }
}

fn find<'a>(reports: &'a [UpliftReport], id: &str) -> &'a UpliftReport {
    reports.iter().find(|r| r.activity.id == id).expect("report present")
}

#[test]
fn baseline_window_is_the_seven_days_before_the_activity() {
    let (start, end) = baseline_window(day(15), 7).unwrap();
    assert_eq!(end, day(14));
    assert_eq!(start, day(8));

    let config = AttributionConfig::default_test();
    let metrics: Vec<DailyMetric> = (1..=17).map(|d| metric("newsletter", day(d), 10, 10)).collect();
    let reports = compute_all_reports(&[activity("a", "newsletter", day(15))], &metrics, &config).unwrap();
    assert_eq!(reports[0].baseline_window_start(), day(8));
    assert_eq!(reports[0].baseline_window_end(), day(14));
}

/// Activations flat at 100/day for 14 days, then 130/140/120.
#[test]
fn flat_baseline_single_activity_lift() {
    let mut config = AttributionConfig::default_test();
    config.baseline_window_days = 14;
    config.post_window_days = 3;
    config.primary_metric = MetricKind::Activations;

    let mut metrics: Vec<DailyMetric> = (1..=14).map(|d| metric("newsletter", day(d), 50, 100)).collect();
    metrics.push(metric("newsletter", day(15), 50, 130));
    metrics.push(metric("newsletter", day(16), 50, 140));
    metrics.push(metric("newsletter", day(17), 50, 120));

    let reports = compute_all_reports(&[activity("send-1", "newsletter", day(15))], &metrics, &config).unwrap();
    let r = &reports[0];

    assert_eq!(r.baseline_avg, 100.0);
    assert_eq!(r.incremental_activations(), 90.0);
    assert_eq!(r.attributed_activations(), 90.0);
    assert_eq!(r.incremental(), 0.0);
    assert_eq!(r.confidence, Confidence::High);
    assert!(r.overlapping_activity_ids.is_empty());

    let attribution = r.post_window_attribution.as_ref().expect("attribution enabled");
    assert_eq!(attribution.overlap_days, 0);
    assert!(attribution.daily_shares.iter().all(|s| s.split == SplitMode::Sole));
}

/// A (weight 3) and B (weight 1) share a day whose incremental is 40.
#[test]
fn weighted_split_on_a_contested_day() {
    let mut config = AttributionConfig::default_test();
    config.post_window_days = 2;

    let mut metrics: Vec<DailyMetric> = (1..=14).map(|d| metric("linkedin", day(d), 100, 100)).collect();
    metrics.push(metric("linkedin", day(15), 100, 100));
    metrics.push(metric("linkedin", day(16), 140, 140));
    metrics.push(metric("linkedin", day(17), 100, 100));

    let mut a = activity("a", "linkedin", day(15));
    a.actual_clicks = Some(3.0);
    let mut b = activity("b", "linkedin", day(16));
    b.deterministic_clicks = Some(1.0);

    let reports = compute_all_reports(&[a, b], &metrics, &config).unwrap();
    let (ra, rb) = (find(&reports, "a"), find(&reports, "b"));

    assert_eq!(ra.incremental(), 40.0);
    assert_eq!(rb.incremental(), 40.0);
    assert_eq!(ra.attributed_signups(), 30.0);
    assert_eq!(rb.attributed_signups(), 10.0);
    assert_eq!(ra.attributed_activations(), 30.0);
    assert_eq!(rb.attributed_activations(), 10.0);

    let wa = ra.post_window_attribution.as_ref().unwrap();
    let wb = rb.post_window_attribution.as_ref().unwrap();
    assert_eq!(wa.weight_source, WeightSource::Actual);
    assert_eq!(wb.weight_source, WeightSource::Deterministic);
    assert_eq!(wa.overlap_days, 1);

    let contested = wa.daily_shares.iter().find(|s| s.date == day(16)).unwrap();
    assert_eq!(contested.contenders, 2);
    assert_eq!(contested.split, SplitMode::Weighted);
    assert_eq!(contested.share, 0.75);
    assert_eq!(contested.channel_incremental_signups, 40.0);
    assert_eq!(contested.reference_activity_id, "a");

    // Overlap caps both at MEDIUM.
    assert_eq!(ra.confidence, Confidence::Medium);
    assert_eq!(rb.confidence, Confidence::Medium);
}

#[test]
fn zero_weights_split_equally() {
    let mut config = AttributionConfig::default_test();
    config.post_window_days = 2;
    config.post_window_attribution.default_weight = 0.0;

    let mut metrics: Vec<DailyMetric> = (1..=15).map(|d| metric("youtube", day(d), 100, 10)).collect();
    metrics.push(metric("youtube", day(16), 140, 10));
    metrics.push(metric("youtube", day(17), 100, 10));

    let mut a = activity("a", "youtube", day(15));
    a.actual_clicks = Some(0.0);
    let b = activity("b", "youtube", day(16));

    let reports = compute_all_reports(&[a, b], &metrics, &config).unwrap();
    let (ra, rb) = (find(&reports, "a"), find(&reports, "b"));

    assert_eq!(ra.attributed_signups(), 20.0);
    assert_eq!(rb.attributed_signups(), 20.0);
    let share = ra
        .post_window_attribution
        .as_ref()
        .unwrap()
        .daily_shares
        .iter()
        .find(|s| s.date == day(16))
        .unwrap()
        .clone();
    assert_eq!(share.split, SplitMode::Equal);
    assert_eq!(share.share, 0.5);
    assert_eq!(
        rb.post_window_attribution.as_ref().unwrap().weight_source,
        WeightSource::Default
    );
}

#[test]
fn below_baseline_days_floor_to_zero() {
    let config = AttributionConfig::default_test();
    let mut metrics: Vec<DailyMetric> = (1..=14).map(|d| metric("newsletter", day(d), 50, 20)).collect();
    metrics.push(metric("newsletter", day(15), 30, 10));
    metrics.push(metric("newsletter", day(16), 60, 15));
    metrics.push(metric("newsletter", day(17), 45, 20));

    let reports = compute_all_reports(&[activity("a", "newsletter", day(15))], &metrics, &config).unwrap();
    let r = &reports[0];

    assert_eq!(r.daily_data()[0].incremental_signups, 0.0);
    assert_eq!(r.daily_data()[1].incremental_signups, 10.0);
    assert_eq!(r.daily_data()[2].incremental_signups, 0.0);
    assert_eq!(r.incremental(), 10.0);
    assert_eq!(r.incremental_activations(), 0.0);
    assert!(r.daily_data().iter().all(|d| d.incremental_signups >= 0.0));
}

#[test]
fn activity_without_baseline_data_still_reports_low() {
    let config = AttributionConfig::default_test();
    let metrics = vec![
        metric("newsletter", day(13), 10, 5),
        metric("newsletter", day(15), 25, 9),
    ];
    let acts = [activity("thin", "newsletter", day(15)), activity("none", "podcast", day(15))];
    let reports = compute_all_reports(&acts, &metrics, &config).unwrap();

    assert_eq!(reports.len(), 2);
    let thin = find(&reports, "thin");
    assert_eq!(thin.confidence, Confidence::Low);
    assert!(thin.confidence_explanation.contains("insufficient baseline data"));
    assert_eq!(thin.incremental(), 15.0);

    let none = find(&reports, "none");
    assert_eq!(none.confidence, Confidence::Low);
    assert_eq!(none.incremental(), 0.0);
    assert!(none.daily_data().iter().all(|d| !d.observed));
}

#[test]
fn duplicate_metric_rows_keep_the_first_row() {
    let mut config = AttributionConfig::default_test();
    config.post_window_days = 2;

    let mut metrics: Vec<DailyMetric> = (1..=15).map(|d| metric("linkedin", day(d), 100, 100)).collect();
    metrics.push(metric("linkedin", day(16), 140, 140));
    metrics.push(metric("linkedin", day(17), 100, 100));
    metrics.push(metric("linkedin", day(16), 500, 500));

    let mut a = activity("a", "linkedin", day(15));
    a.actual_clicks = Some(3.0);
    let mut b = activity("b", "linkedin", day(16));
    b.deterministic_clicks = Some(1.0);

    let reports = compute_all_reports(&[a, b], &metrics, &config).unwrap();
    let (ra, rb) = (find(&reports, "a"), find(&reports, "b"));

    assert_eq!(ra.incremental(), 40.0);
    assert_eq!(rb.incremental(), 40.0);
    assert_eq!(ra.attributed_signups(), 30.0);
    assert_eq!(rb.attributed_signups(), 10.0);
    let contested = ra
        .post_window_attribution
        .as_ref()
        .unwrap()
        .daily_shares
        .iter()
        .find(|s| s.date == day(16))
        .unwrap()
        .clone();
    assert_eq!(contested.channel_incremental_signups, 40.0);
}

/// A's post-window (days 10-12) spikes to 160; B on day 15 has those days
/// inside its seven-day baseline. Organic level is 100.
#[test]
fn excluding_other_post_windows_restores_the_organic_baseline() {
    let metrics: Vec<DailyMetric> = (1..=20)
        .map(|d| {
            let signups = match d {
                10..=12 => 160,
                15..=17 => 130,
                _ => 100,
            };
            metric("podcast", day(d), signups, 50)
        })
        .collect();
    let acts = [activity("a", "podcast", day(10)), activity("b", "podcast", day(15))];

    let mut config = AttributionConfig::default_test();
    let included = compute_all_reports(&acts, &metrics, &config).unwrap();
    config.baseline_policy = BaselinePolicy::ExcludeOtherPostWindows;
    let excluded = compute_all_reports(&acts, &metrics, &config).unwrap();

    let (b_in, b_ex) = (find(&included, "b"), find(&excluded, "b"));
    assert_eq!(b_in.baseline.excluded_days, 0);
    assert_eq!(b_in.baseline.data_days, 7);
    assert!(b_in.baseline_avg > 100.0, "spike inflates the included baseline");
    assert_eq!(b_in.confidence, Confidence::High);

    assert_eq!(b_ex.baseline.excluded_days, 3);
    assert_eq!(b_ex.baseline.data_days, 4);
    assert_eq!(b_ex.baseline_avg, 100.0);
    assert_eq!(b_ex.incremental(), 90.0);
    assert_eq!(b_ex.attributed_signups(), 90.0);
    assert!(b_ex.baseline.coverage() < b_in.baseline.coverage());
    assert!(b_ex.confidence < b_in.confidence);
    assert_eq!(b_ex.confidence, Confidence::Medium);

    let a_ex = find(&excluded, "a");
    assert_eq!(a_ex.baseline.excluded_days, 0);
    assert_eq!(a_ex, find(&included, "a"));
}

#[test]
fn calendar_edge_dates_report_zero_lift_without_affecting_others() {
    let mut metrics: Vec<DailyMetric> = (1..=14).map(|d| metric("newsletter", day(d), 10, 10)).collect();
    metrics.extend((15..=17).map(|d| metric("newsletter", day(d), 20, 10)));
    let normal = activity("a", "newsletter", day(15));

    for policy in [BaselinePolicy::Include, BaselinePolicy::ExcludeOtherPostWindows] {
        let mut config = AttributionConfig::default_test();
        config.baseline_policy = policy;

        let alone = compute_all_reports(&[normal.clone()], &metrics, &config).unwrap();
        let acts = [
            normal.clone(),
            activity("late", "newsletter", NaiveDate::MAX),
            activity("early", "newsletter", NaiveDate::MIN),
        ];
        let reports = compute_all_reports(&acts, &metrics, &config).unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(find(&reports, "a"), &alone[0]);
        assert_eq!(find(&reports, "a").incremental(), 30.0);

        for id in ["late", "early"] {
            let r = find(&reports, id);
            assert_eq!(r.confidence, Confidence::Low);
            assert!(r.confidence_explanation.contains("calendar range"), "{}", r.confidence_explanation);
            assert_eq!(r.incremental(), 0.0);
            assert_eq!(r.attributed_signups(), 0.0);
            assert!(r.daily_data().is_empty());
        }
    }
}
