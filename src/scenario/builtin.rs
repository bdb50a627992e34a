use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::http::{HttpMethod, RequestTemplate, StatusSet};
use crate::metrics::{HTTP_REQ_DURATION, HTTP_REQ_FAILED, HTTP_REQS};

use super::{Check, CheckRule, Group, Scenario};

pub const HEALTH_GROUP: &str = "Basic Health Check";
pub const CORS_GROUP: &str = "CORS Preflight Works";
pub const PROXY_GROUP: &str = "Basic Proxy Works";
pub const ERROR_GROUP: &str = "Error Handling Works";

const CORS_ORIGIN: &str = "https://example.com";
const ALLOW_ORIGIN_HEADER: &str = "Access-Control-Allow-Origin";
const MISSING_PATH: &str = "/this-definitely-does-not-exist";
const PRESET_VUS: u64 = 5;
const SMOKE_DURATION: Duration = Duration::from_secs(30);
const LOAD_STAGES: [(u64, u64); 7] = [
    (60, 500),
    (60, 1000),
    (120, 1500),
    (300, 2000),
    (600, 2500),
    (300, 2500),
    (120, 1000),
];

/// Built-in run presets for the proxy under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// 5 VUs for 30s through every functional group.
    Smoke,
    /// Seven-stage ramp to 2500 VUs against the proxy route.
    Load,
}

impl Preset {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Preset::Smoke => "smoke",
            Preset::Load => "load",
        }
    }

    #[must_use]
    pub fn scenario(self) -> Scenario {
        match self {
            Preset::Smoke => smoke_scenario(),
            Preset::Load => load_scenario(),
        }
    }

    /// Start VUs used when the preset drives the shape. The load ramp
    /// begins from this level too.
    #[must_use]
    pub const fn vus(self) -> u64 {
        match self {
            Preset::Smoke | Preset::Load => PRESET_VUS,
        }
    }

    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Preset::Smoke => Some(SMOKE_DURATION),
            Preset::Load => None,
        }
    }

    /// `(duration, target)` pairs of the ramp profile.
    #[must_use]
    pub fn stages(self) -> Vec<(Duration, u64)> {
        match self {
            Preset::Smoke => Vec::new(),
            Preset::Load => LOAD_STAGES
                .iter()
                .map(|(secs, target)| (Duration::from_secs(*secs), *target))
                .collect(),
        }
    }

    /// `(key, expression)` pairs of the preset's thresholds.
    #[must_use]
    pub fn thresholds(self) -> Vec<(String, String)> {
        let mut thresholds = match self {
            Preset::Smoke => vec![(HTTP_REQ_DURATION.to_owned(), "p(95)<500".to_owned())],
            Preset::Load => vec![(HTTP_REQS.to_owned(), "rate>900".to_owned())],
        };
        thresholds.push((
            format!("{}{{expectedError:not_found}}", HTTP_REQ_FAILED),
            "rate<1".to_owned(),
        ));
        thresholds.push((
            format!("{}{{expectedError:!not_found}}", HTTP_REQ_FAILED),
            "rate<0.1".to_owned(),
        ));
        thresholds
    }
}

/// Functional pass over the proxy: health, CORS preflight, proxying and
/// error handling.
#[must_use]
pub fn smoke_scenario() -> Scenario {
    let health = Group::new(HEALTH_GROUP, RequestTemplate::new(HttpMethod::Get, "/health"))
        .check(Check::new(
            "health endpoint is reachable",
            CheckRule::StatusEquals { status: 200 },
        ))
        .check(Check::new(
            "health returns OK",
            CheckRule::BodyContains {
                text: "OK".to_owned(),
            },
        ));

    let preflight = RequestTemplate::new(HttpMethod::Options, "/get")
        .header("Origin", CORS_ORIGIN)
        .header("Access-Control-Request-Method", "GET");
    let cors = Group::new(CORS_GROUP, preflight)
        .check(Check::new(
            "preflight request succeeds",
            CheckRule::StatusEquals { status: 204 },
        ))
        .check(cors_header_check("preflight has allow-origin"));

    let proxy = Group::new(PROXY_GROUP, RequestTemplate::new(HttpMethod::Get, "/get"))
        .check(Check::new(
            "proxy request succeeds",
            CheckRule::StatusEquals { status: 200 },
        ))
        .check(cors_header_check("response has CORS headers"))
        .check(Check::new("response looks like JSON", CheckRule::BodyIsJson));

    let not_found = RequestTemplate::new(HttpMethod::Get, MISSING_PATH)
        .with_expected_statuses(not_found_statuses());
    let errors = Group::new(ERROR_GROUP, not_found)
        .tag("expectedError", "not_found")
        .check(Check::new(
            "returns some error status",
            CheckRule::StatusAtLeast { status: 400 },
        ))
        .check(cors_header_check("error response has CORS"));

    Scenario {
        name: Preset::Smoke.as_str().to_owned(),
        groups: vec![health, cors, proxy, errors],
    }
}

/// Throughput pass: proxy route only, no checks.
#[must_use]
pub fn load_scenario() -> Scenario {
    Scenario {
        name: Preset::Load.as_str().to_owned(),
        groups: vec![Group::new(
            PROXY_GROUP,
            RequestTemplate::new(HttpMethod::Get, "/get"),
        )],
    }
}

fn cors_header_check(name: &str) -> Check {
    Check::new(
        name,
        CheckRule::HeaderPresent {
            header: ALLOW_ORIGIN_HEADER.to_owned(),
        },
    )
}

fn not_found_statuses() -> StatusSet {
    StatusSet::new(vec![200..=399, 404..=404])
}
