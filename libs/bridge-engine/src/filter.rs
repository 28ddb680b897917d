//! MQTT-style topic filters.
//!
//! Topics are hierarchical names separated by `/`:
//! - `+` matches exactly one level: `sensors/+` matches `sensors/a`
//! - `#` matches the remaining levels, zero or more: `sensors/#` matches
//!   `sensors`, `sensors/a` and `sensors/a/temp`
//!
//! Wildcards must occupy a whole level and `#` must be the last one.
//! A wildcard in the first level never matches a `$`-prefixed topic.

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Level {
    Exact(String),
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    raw: String,
    levels: Vec<Level>,
}

impl TopicFilter {
    pub fn parse(filter: &str) -> Result<Self, EngineError> {
        if filter.is_empty() {
            return Err(EngineError::Config("empty topic filter".into()));
        }

        let parts: Vec<&str> = filter.split('/').collect();
        let mut levels = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let level = match *part {
                "#" if i + 1 == parts.len() => Level::Multi,
                "#" => {
                    return Err(EngineError::Config(format!(
                        "topic filter '{filter}': '#' must be the last level"
                    )));
                }
                "+" => Level::Single,
                p if p.contains(['+', '#']) => {
                    return Err(EngineError::Config(format!(
                        "topic filter '{filter}': wildcard must occupy a whole level"
                    )));
                }
                p => Level::Exact(p.to_string()),
            };
            levels.push(level);
        }

        Ok(Self {
            raw: filter.to_string(),
            levels,
        })
    }

    pub fn matches(&self, topic: &str) -> bool {
        if topic.starts_with('$') && !matches!(self.levels.first(), Some(Level::Exact(_))) {
            return false;
        }

        let mut parts = topic.split('/');
        for level in &self.levels {
            match level {
                Level::Multi => return true,
                Level::Single => {
                    if parts.next().is_none() {
                        return false;
                    }
                }
                Level::Exact(expected) => match parts.next() {
                    Some(part) if part == expected => {}
                    _ => return false,
                },
            }
        }
        parts.next().is_none()
    }
}

impl std::fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(s: &str) -> TopicFilter {
        TopicFilter::parse(s).unwrap()
    }

    #[test]
    fn exact_topic() {
        let f = filter("sensors/a");
        assert!(f.matches("sensors/a"));
        assert!(!f.matches("sensors/b"));
        assert!(!f.matches("sensors/a/temp"));
        assert!(!f.matches("sensors"));
    }

    #[test]
    fn single_level_wildcard() {
        let f = filter("sensors/+/temp");
        assert!(f.matches("sensors/a/temp"));
        assert!(f.matches("sensors//temp"));
        assert!(!f.matches("sensors/a/b/temp"));
        assert!(!f.matches("sensors/a"));
    }

    #[test]
    fn multi_level_wildcard() {
        let f = filter("sensors/#");
        assert!(f.matches("sensors"));
        assert!(f.matches("sensors/a"));
        assert!(f.matches("sensors/a/temp"));
        assert!(!f.matches("actuators/a"));

        assert!(filter("#").matches("anything/at/all"));
    }

    #[test]
    fn dollar_topics_need_explicit_first_level() {
        assert!(!filter("#").matches("$SYS/broker"));
        assert!(!filter("+/broker").matches("$SYS/broker"));
        assert!(filter("$SYS/#").matches("$SYS/broker"));
    }

    #[test]
    fn invalid_filters() {
        assert!(TopicFilter::parse("").is_err());
        assert!(TopicFilter::parse("sensors/#/temp").is_err());
        assert!(TopicFilter::parse("sensors/a#").is_err());
        assert!(TopicFilter::parse("sens+ors").is_err());
    }
}
