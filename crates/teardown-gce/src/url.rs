//! Compute API resource URLs
//!
//! Self links look like
//! `https://www.googleapis.com/compute/v1/projects/<project>/zones/<zone>/disks/<name>`;
//! the location segment is `global`, `zones/<zone>` or `regions/<region>`.

use crate::error::GceError;
use std::fmt;

/// A parsed compute self link
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GoogleCloudUrl {
    pub version: Option<String>,
    pub project: String,
    /// Collection name, e.g. `disks` or `instanceTemplates`
    pub resource_type: String,
    pub name: String,
    pub global: bool,
    pub zone: Option<String>,
    pub region: Option<String>,
}

const COMPUTE_PREFIX: &str = "https://www.googleapis.com/compute/";

impl GoogleCloudUrl {
    pub fn parse(url: &str) -> Result<Self, GceError> {
        let invalid = || GceError::InvalidUrl(url.to_string());

        let path = url
            .strip_prefix(COMPUTE_PREFIX)
            .or_else(|| url.strip_prefix("https://compute.googleapis.com/compute/"))
            .unwrap_or(url);
        let mut tokens: Vec<&str> = path.split('/').filter(|t| !t.is_empty()).collect();

        let mut parsed = GoogleCloudUrl::default();
        if tokens.first().is_some_and(|t| *t != "projects") {
            parsed.version = Some(tokens.remove(0).to_string());
        }

        match tokens.as_slice() {
            ["projects", project, rest @ ..] => {
                parsed.project = project.to_string();
                let rest = match rest {
                    ["global", rest @ ..] => {
                        parsed.global = true;
                        rest
                    }
                    ["zones", zone] => {
                        parsed.zone = Some(zone.to_string());
                        parsed.resource_type = "zones".to_string();
                        parsed.name = zone.to_string();
                        return Ok(parsed);
                    }
                    ["regions", region] => {
                        parsed.region = Some(region.to_string());
                        parsed.resource_type = "regions".to_string();
                        parsed.name = region.to_string();
                        return Ok(parsed);
                    }
                    ["zones", zone, rest @ ..] => {
                        parsed.zone = Some(zone.to_string());
                        rest
                    }
                    ["regions", region, rest @ ..] => {
                        parsed.region = Some(region.to_string());
                        rest
                    }
                    _ => return Err(invalid()),
                };
                match rest {
                    [resource_type, name] => {
                        parsed.resource_type = resource_type.to_string();
                        parsed.name = name.to_string();
                        Ok(parsed)
                    }
                    _ => Err(invalid()),
                }
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for GoogleCloudUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{COMPUTE_PREFIX}{}/projects/{}",
            self.version.as_deref().unwrap_or("v1"),
            self.project
        )?;
        if self.global {
            write!(f, "/global")?;
        } else if let Some(zone) = &self.zone {
            write!(f, "/zones/{zone}")?;
        } else if let Some(region) = &self.region {
            write!(f, "/regions/{region}")?;
        }
        if self.resource_type == "zones" || self.resource_type == "regions" {
            return Ok(());
        }
        write!(f, "/{}/{}", self.resource_type, self.name)
    }
}

/// Text after the last `/`, or the whole string if there is none
pub fn last_component(s: &str) -> &str {
    s.rsplit_once('/').map_or(s, |(_, last)| last)
}
