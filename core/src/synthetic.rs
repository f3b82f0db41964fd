//! Seeded synthetic datasets for demos and tests.
//!
//! RULE: the engine itself never draws random numbers. Randomness exists
//! only here, to fabricate input data, and flows from one master seed.
//! Each channel gets its own stream seeded from (seed XOR channel index),
//! so adding a channel never changes the data of existing ones.

use crate::{
    activity::{Activity, ActivityStatus, ActivityType, DailyMetric},
    types::Day,
};
use chrono::Duration;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct SyntheticRng {
    inner: Pcg64Mcg,
}

impl SyntheticRng {
    pub fn new(master_seed: u64, stream: u64) -> Self {
        let derived_seed = master_seed ^ (stream.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self { inner: Pcg64Mcg::seed_from_u64(derived_seed) }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Standard normal draw (Box–Muller).
    pub fn standard_normal(&mut self) -> f64 {
        let u1 = self.next_f64().max(1e-12);
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

#[derive(Debug, Clone)]
pub struct ChannelProfile {
    pub channel:          String,
    pub activity_type:    ActivityType,
    pub base_signups:     f64,
    pub base_activations: f64,
    /// Relative day-to-day noise (std dev as a fraction of the base).
    pub noise:            f64,
    pub activity_count:   usize,
    /// Day-0 lift per 100 clicks; decays by half each following day.
    pub lift_per_100_clicks: f64,
    /// Fraction of lifted signups that also activate.
    pub activation_rate:  f64,
}

#[derive(Debug, Clone)]
pub struct SyntheticSpec {
    pub start:     Day,
    pub days:      u32,
    /// Leading days with no activities so baselines have data.
    pub warmup_days: u32,
    pub channels:  Vec<ChannelProfile>,
}

impl SyntheticSpec {
    /// Three channels over a quarter, with clustered campaigns that overlap.
    pub fn demo(start: Day) -> Self {
        Self {
            start,
            days: 90,
            warmup_days: 21,
            channels: vec![
                ChannelProfile {
                    channel:          "newsletter".into(),
                    activity_type:    ActivityType::NewsletterSend,
                    base_signups:     40.0,
                    base_activations: 18.0,
                    noise:            0.12,
                    activity_count:   8,
                    lift_per_100_clicks: 9.0,
                    activation_rate:  0.45,
                },
                ChannelProfile {
                    channel:          "linkedin".into(),
                    activity_type:    ActivityType::LinkedinPost,
                    base_signups:     12.0,
                    base_activations: 5.0,
                    noise:            0.3,
                    activity_count:   10,
                    lift_per_100_clicks: 6.0,
                    activation_rate:  0.35,
                },
                ChannelProfile {
                    channel:          "youtube".into(),
                    activity_type:    ActivityType::YoutubeVideo,
                    base_signups:     6.0,
                    base_activations: 2.0,
                    noise:            0.5,
                    activity_count:   4,
                    lift_per_100_clicks: 4.0,
                    activation_rate:  0.3,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyntheticDataset {
    pub activities: Vec<Activity>,
    pub metrics:    Vec<DailyMetric>,
}

/// Build a dataset. Identical (spec, seed) pairs give identical output.
pub fn generate(spec: &SyntheticSpec, seed: u64) -> SyntheticDataset {
    let mut out = SyntheticDataset::default();
    let active_days = spec.days.saturating_sub(spec.warmup_days).max(1);

    for (index, profile) in spec.channels.iter().enumerate() {
        let mut rng = SyntheticRng::new(seed, index as u64);
        let mut lift_signups = vec![0.0f64; spec.days as usize];

        for n in 0..profile.activity_count {
            let offset = spec.warmup_days + rng.next_u64_below(u64::from(active_days)) as u32;
            let date = spec.start + Duration::days(i64::from(offset));
            let clicks = 50.0 + rng.next_u64_below(450) as f64;
            let tracked = rng.chance(0.6);

            let mut day_lift = clicks / 100.0 * profile.lift_per_100_clicks;
            let mut d = offset as usize;
            while d < lift_signups.len() && day_lift >= 0.5 {
                lift_signups[d] += day_lift;
                day_lift /= 2.0;
                d += 1;
            }

            out.activities.push(Activity {
                id:            format!("{}-{:03}", profile.channel, n + 1),
                activity_type: profile.activity_type,
                channel:       profile.channel.clone(),
                partner_name:  format!("partner-{}", rng.next_u64_below(5) + 1),
                date,
                status:        ActivityStatus::Published,
                cost_usd:      Some((clicks * 1.5).round()),
                deterministic_clicks: Some((clicks * 0.9).round()),
                actual_clicks: tracked.then_some(clicks),
                deterministic_tracked_signups: None,
                metadata:      Some([("impressions".to_string(), (clicks * 40.0).round())].into_iter().collect()),
                content_url:   None,
                channel_url:   None,
                notes:         None,
            });
        }

        for (offset, lift) in lift_signups.iter().enumerate() {
            let signups = noisy(&mut rng, profile.base_signups, profile.noise) + lift;
            let activations =
                noisy(&mut rng, profile.base_activations, profile.noise) + lift * profile.activation_rate;
            out.metrics.push(DailyMetric {
                date:        spec.start + Duration::days(offset as i64),
                channel:     profile.channel.clone(),
                signups:     signups.round() as i64,
                activations: activations.round() as i64,
            });
        }
    }

    out.activities.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    out.metrics.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.channel.cmp(&b.channel)));
    out
}

fn noisy(rng: &mut SyntheticRng, base: f64, noise: f64) -> f64 {
    (base * (1.0 + noise * rng.standard_normal())).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> Day {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn same_seed_same_dataset() {
        let spec = SyntheticSpec::demo(start());
        let a = generate(&spec, 7);
        let b = generate(&spec, 7);
        assert_eq!(a.activities, b.activities);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn different_seeds_diverge() {
        let spec = SyntheticSpec::demo(start());
        assert_ne!(generate(&spec, 1).metrics, generate(&spec, 2).metrics);
    }

    #[test]
    fn one_metric_row_per_channel_day() {
        let spec = SyntheticSpec::demo(start());
        let data = generate(&spec, 11);
        assert_eq!(data.metrics.len(), spec.days as usize * spec.channels.len());
        assert!(data.metrics.iter().all(|m| m.signups >= 0 && m.activations >= 0));
        assert!(data.activities.iter().all(|a| a.date >= start() + Duration::days(21)));
    }
}
