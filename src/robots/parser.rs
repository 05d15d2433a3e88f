//! Robots.txt parser implementation
//!
//! Allow/deny decisions are delegated to the `robotstxt` crate; the
//! reporting fields (sitemaps, disallowed paths, crawl-delay) are read in a
//! single pass over the file.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    /// Raw robots.txt content (empty means allow all)
    content: String,
    groups: Vec<Group>,
    sitemaps: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct Group {
    agents: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        let mut groups: Vec<Group> = Vec::new();
        let mut sitemaps = Vec::new();
        // A run of User-agent lines opens a group; any rule line closes the run.
        let mut collecting_agents = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    if !collecting_agents {
                        groups.push(Group::default());
                        collecting_agents = true;
                    }
                    if let Some(group) = groups.last_mut() {
                        group.agents.push(value.to_ascii_lowercase());
                    }
                }
                "sitemap" => {
                    // url values contain ':' so rejoin the split
                    let full = line[line.find(':').map_or(0, |i| i + 1)..].trim();
                    if !full.is_empty() {
                        sitemaps.push(full.to_string());
                    }
                }
                "disallow" => {
                    collecting_agents = false;
                    if let Some(group) = groups.last_mut() {
                        if !value.is_empty() {
                            group.disallow.push(value.to_string());
                        }
                    }
                }
                "crawl-delay" => {
                    collecting_agents = false;
                    if let (Some(group), Ok(delay)) = (groups.last_mut(), value.parse::<f64>()) {
                        group.crawl_delay = Some(delay);
                    }
                }
                _ => collecting_agents = false,
            }
        }

        Self {
            content: content.to_string(),
            groups,
            sitemaps,
        }
    }

    /// Creates a permissive policy, used when robots.txt is missing
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks if a full URL is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Crawl delay in seconds for the agent, preferring a specific group over `*`
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.group_for(user_agent).and_then(|g| g.crawl_delay)
    }

    /// Disallow rules that apply to the agent
    pub fn disallowed_paths(&self, user_agent: &str) -> Vec<String> {
        self.group_for(user_agent)
            .map(|g| g.disallow.clone())
            .unwrap_or_default()
    }

    /// `Sitemap:` URLs declared anywhere in the file
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }

    fn group_for(&self, user_agent: &str) -> Option<&Group> {
        let agent = user_agent.to_ascii_lowercase();
        self.groups
            .iter()
            .find(|g| g.agents.iter().any(|a| a != "*" && agent.contains(a.as_str())))
            .or_else(|| self.groups.iter().find(|g| g.agents.iter().any(|a| a == "*")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "\
User-agent: *
Disallow: /admin
Disallow: /private/
Crawl-delay: 2

User-agent: SumiLens
Disallow: /drafts
Crawl-delay: 0.5

Sitemap: https://example.com/sitemap.xml
";

    #[test]
    fn test_allow_all_allows_everything() {
        let robots = RobotsPolicy::allow_all();
        assert!(robots.is_allowed("https://example.com/admin", "SumiLens"));
        assert!(robots.crawl_delay("SumiLens").is_none());
        assert!(robots.sitemaps().is_empty());
    }

    #[test]
    fn test_disallow_for_wildcard_agent() {
        let robots = RobotsPolicy::from_content(ROBOTS);
        assert!(!robots.is_allowed("https://example.com/admin", "OtherBot"));
        assert!(robots.is_allowed("https://example.com/blog", "OtherBot"));
    }

    #[test]
    fn test_specific_agent_group_wins() {
        let robots = RobotsPolicy::from_content(ROBOTS);
        assert_eq!(robots.crawl_delay("Mozilla/5.0 (compatible; SumiLens/1.0)"), Some(0.5));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(2.0));
        assert_eq!(robots.disallowed_paths("sumilens"), vec!["/drafts".to_string()]);
        assert_eq!(
            robots.disallowed_paths("OtherBot"),
            vec!["/admin".to_string(), "/private/".to_string()]
        );
    }

    #[test]
    fn test_sitemaps_keep_full_url() {
        let robots = RobotsPolicy::from_content(ROBOTS);
        assert_eq!(robots.sitemaps(), ["https://example.com/sitemap.xml".to_string()]);
    }

    #[test]
    fn test_comments_are_ignored() {
        let robots =
            RobotsPolicy::from_content("# nothing here\nUser-agent: * # all\nDisallow: /x\n");
        assert_eq!(robots.disallowed_paths("bot"), vec!["/x".to_string()]);
    }
}
