//! Minimal robots.txt support: what the crawl engine actually consults.

use std::time::Duration;

/// Parsed rules for our user agent (specific section if present,
/// otherwise the `*` section).
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    disallow: Vec<String>,
    allow: Vec<String>,
    crawl_delay: Option<f64>,
}

impl RobotsRules {
    /// Parse robots.txt content, keeping the section that applies to
    /// `user_agent` (longest matching agent token wins, `*` as fallback).
    pub fn parse(content: &str, user_agent: &str) -> Self {
        let agent_lower = user_agent.to_lowercase();

        let mut wildcard = RobotsRules::default();
        let mut specific: Option<RobotsRules> = None;

        let mut current_agents: Vec<String> = Vec::new();
        let mut current = RobotsRules::default();
        let mut in_record = false;

        let mut flush = |agents: &[String], rules: RobotsRules| {
            for agent in agents {
                if agent == "*" {
                    wildcard = rules.clone();
                } else if agent_lower.contains(agent.as_str()) {
                    specific = Some(rules.clone());
                }
            }
        };

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };
            let directive = directive.trim().to_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if in_record {
                        flush(&current_agents, std::mem::take(&mut current));
                        current_agents.clear();
                        in_record = false;
                    }
                    current_agents.push(value.to_lowercase());
                }
                "disallow" => {
                    in_record = true;
                    if !value.is_empty() {
                        current.disallow.push(value.to_string());
                    }
                }
                "allow" => {
                    in_record = true;
                    if !value.is_empty() {
                        current.allow.push(value.to_string());
                    }
                }
                "crawl-delay" => {
                    in_record = true;
                    current.crawl_delay = value.parse().ok();
                }
                _ => {}
            }
        }
        flush(&current_agents, current);

        specific.unwrap_or(wildcard)
    }

    /// Allow rules take precedence over disallow prefixes.
    pub fn is_allowed(&self, path: &str) -> bool {
        if self.allow.iter().any(|prefix| path.starts_with(prefix)) {
            return true;
        }
        !self.disallow.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Whole-site disallow means the retailer run aborts.
    pub fn disallows_all(&self) -> bool {
        !self.is_allowed("/")
    }

    /// A `Disallow: /*?page=` style rule — the signal that pagination
    /// must happen by click replay, not query parameters.
    pub fn blocks_query_param(&self, param: &str) -> bool {
        let needle = format!("?{}=", param);
        self.disallow.iter().any(|rule| rule.contains(&needle))
    }

    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay.map(Duration::from_secs_f64)
    }
}

/// Fetch and parse a site's robots.txt. A missing or erroring robots.txt
/// allows everything.
pub async fn fetch_robots(
    client: &reqwest::Client,
    base_url: &str,
    user_agent: &str,
) -> RobotsRules {
    let url = format!("{}/robots.txt", base_url.trim_end_matches('/'));
    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => match response.text().await {
            Ok(content) => RobotsRules::parse(&content, user_agent),
            Err(_) => RobotsRules::default(),
        },
        _ => RobotsRules::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = r#"
# retailer robots
User-agent: *
Disallow: /admin/
Disallow: /*?page=
Allow: /category/
Crawl-delay: 2
"#;

    #[test]
    fn prefix_rules_apply() {
        let rules = RobotsRules::parse(ROBOTS, "partscout");
        assert!(!rules.is_allowed("/admin/login"));
        assert!(rules.is_allowed("/category/processor"));
        assert!(rules.is_allowed("/some-product"));
        assert!(!rules.disallows_all());
    }

    #[test]
    fn page_param_block_is_detected() {
        let rules = RobotsRules::parse(ROBOTS, "partscout");
        assert!(rules.blocks_query_param("page"));
        assert!(!rules.blocks_query_param("sort"));
    }

    #[test]
    fn crawl_delay_parses() {
        let rules = RobotsRules::parse(ROBOTS, "partscout");
        assert_eq!(rules.crawl_delay(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn specific_agent_section_wins() {
        let content = r#"
User-agent: *
Disallow: /

User-agent: partscout
Disallow: /admin/
"#;
        let rules = RobotsRules::parse(content, "partscout/0.1");
        assert!(rules.is_allowed("/category/ram"));
        assert!(!rules.is_allowed("/admin/"));

        let other = RobotsRules::parse(content, "otherbot");
        assert!(other.disallows_all());
    }

    #[test]
    fn empty_robots_allows_everything() {
        let rules = RobotsRules::parse("", "partscout");
        assert!(rules.is_allowed("/anything"));
        assert!(rules.crawl_delay().is_none());
    }
}
