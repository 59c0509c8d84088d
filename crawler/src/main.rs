use anyhow::{anyhow, Result};
use clap::Parser;
use reqwest::{header, Client};
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::time::Duration;
use time::format_description::well_known::Rfc3339;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "crawler")]
#[command(about = "Crawl a product site to JSONL, respecting robots.txt")]
struct Cli {
    /// URL the crawl starts from
    #[arg(long)]
    seed: String,
    /// Output JSONL file path
    #[arg(long, default_value = "./output/crawl.jsonl")]
    output: String,
    /// Maximum number of pages to fetch
    #[arg(long, default_value_t = 50)]
    max_pages: usize,
    /// Seconds to wait between requests; robots.txt Crawl-delay takes precedence
    #[arg(long, default_value_t = 1.0)]
    politeness: f64,
    /// Links containing this word (case-sensitive) are crawled first
    #[arg(long, default_value = "product")]
    priority_word: String,
    /// Request timeout seconds
    #[arg(long, default_value_t = 5)]
    timeout_secs: u64,
    #[arg(long, default_value = "catalog-crawler/0.1")]
    user_agent: String,
    /// Only follow links on the seed's host
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    same_host_only: bool,
}

#[derive(Debug, Clone, Default)]
struct Robots {
    allows: Vec<String>,
    disallows: Vec<String>,
    crawl_delay_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PageRecord {
    url: String,
    title: String,
    first_paragraph: String,
    links: Vec<String>,
    timestamp: String,
}

struct Crawler {
    client: Client,
    robots: Robots,
    delay: Duration,
    priority_word: String,
    same_host: Option<String>,
    queue: VecDeque<Url>,
    visited: HashSet<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let seed = Url::parse(&args.seed)?;
    if !seed.scheme().starts_with("http") {
        return Err(anyhow!("seed must be an http(s) URL, got {}", args.seed));
    }
    if args.max_pages == 0 {
        return Err(anyhow!("max_pages must be positive"));
    }
    if args.politeness <= 0.0 {
        return Err(anyhow!("politeness must be positive"));
    }

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;
    let robots = fetch_robots(&client, &seed).await;
    let politeness_ms = (args.politeness * 1000.0) as u64;
    let delay = Duration::from_millis(robots.crawl_delay_ms.unwrap_or(politeness_ms));
    tracing::info!(
        seed = %seed,
        max_pages = args.max_pages,
        delay_ms = delay.as_millis() as u64,
        "crawl starting"
    );

    if let Some(dir) = std::path::Path::new(&args.output).parent() {
        fs::create_dir_all(dir)?;
    }
    let mut out = BufWriter::new(File::create(&args.output)?);

    let mut crawler = Crawler {
        client,
        robots,
        delay,
        priority_word: args.priority_word,
        same_host: args.same_host_only.then(|| seed.host_str().map(str::to_string)).flatten(),
        queue: VecDeque::from([seed]),
        visited: HashSet::new(),
    };
    let pages = crawler.run(args.max_pages, &mut out).await?;
    out.flush()?;
    tracing::info!(pages, visited = crawler.visited.len(), output = %args.output, "crawl complete");
    Ok(())
}

impl Crawler {
    async fn run<W: Write>(&mut self, max_pages: usize, out: &mut W) -> Result<usize> {
        let mut pages = 0usize;
        while pages < max_pages {
            let Some(url) = self.queue.pop_front() else { break };
            let key = norm(&url);
            if self.visited.contains(&key) {
                continue;
            }
            self.visited.insert(key);
            if !path_allowed(url.path(), &self.robots) {
                tracing::warn!(url = %url, "disallowed by robots.txt");
                continue;
            }

            tracing::info!(page = pages + 1, max_pages, url = %url, "crawling");
            match self.fetch(&url).await {
                Ok(Some(body)) => {
                    let record = extract_page(&url, &body);
                    let links: Vec<Url> =
                        record.links.iter().filter_map(|l| Url::parse(l).ok()).collect();
                    self.enqueue(links);
                    serde_json::to_writer(&mut *out, &record)?;
                    out.write_all(b"\n")?;
                    pages += 1;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(url = %url, error = %e, "fetch failed"),
            }
            sleep(self.delay).await;
        }
        Ok(pages)
    }

    /// Body of an HTML page, or `None` for non-success statuses and other content types.
    async fn fetch(&self, url: &Url) -> Result<Option<String>> {
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            tracing::warn!(url = %url, status = resp.status().as_u16(), "non-success status");
            return Ok(None);
        }
        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            if !ct.starts_with("text/html") {
                return Ok(None);
            }
        }
        Ok(Some(resp.text().await?))
    }

    /// Priority links go to the front in page order, the rest to the back.
    fn enqueue(&mut self, links: Vec<Url>) {
        let (priority, other): (Vec<Url>, Vec<Url>) = links
            .into_iter()
            .filter(|l| self.same_host.as_deref().map_or(true, |h| l.host_str() == Some(h)))
            .partition(|l| l.as_str().contains(self.priority_word.as_str()));
        for link in priority.into_iter().rev() {
            self.queue.push_front(link);
        }
        self.queue.extend(other);
    }
}

async fn fetch_robots(client: &Client, seed: &Url) -> Robots {
    let robots_url = match seed.join("/robots.txt") {
        Ok(u) => u,
        Err(_) => return Robots::default(),
    };
    match client.get(robots_url).send().await {
        Ok(resp) if resp.status().is_success() => {
            parse_robots(&resp.text().await.unwrap_or_default())
        }
        _ => Robots::default(),
    }
}

fn extract_page(url: &Url, body: &str) -> PageRecord {
    let doc = Html::parse_document(body);
    let title = first_text(&doc, "title");
    let first_paragraph = first_text(&doc, "p");

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    if let Ok(sel) = Selector::parse("a[href]") {
        for a in doc.select(&sel) {
            let Some(href) = a.value().attr("href") else { continue };
            if let Ok(mut u) = url.join(href) {
                u.set_fragment(None);
                if u.scheme().starts_with("http") && seen.insert(u.to_string()) {
                    links.push(u.to_string());
                }
            }
        }
    }

    PageRecord {
        url: url.to_string(),
        title,
        first_paragraph,
        links,
        timestamp: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
    }
}

fn first_text(doc: &Html, selector: &str) -> String {
    Selector::parse(selector)
        .ok()
        .and_then(|sel| doc.select(&sel).next().map(|n| n.text().collect::<String>()))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn norm(u: &Url) -> String {
    let mut s = u.clone();
    s.set_fragment(None);
    s.to_string()
}

fn parse_robots(txt: &str) -> Robots {
    // only the '*' group is honoured
    let mut active = false;
    let mut robots = Robots::default();
    for line in txt.lines() {
        let l = line.split('#').next().unwrap_or("").trim();
        if l.is_empty() {
            continue;
        }
        if let Some((k, v)) = l.split_once(':') {
            let val = v.trim();
            match k.trim().to_lowercase().as_str() {
                "user-agent" => active = val == "*",
                "allow" if active && !val.is_empty() => robots.allows.push(val.to_string()),
                "disallow" if active && !val.is_empty() => robots.disallows.push(val.to_string()),
                "crawl-delay" if active => {
                    if let Ok(n) = val.parse::<f64>() {
                        robots.crawl_delay_ms = Some((n * 1000.0) as u64);
                    }
                }
                _ => {}
            }
        }
    }
    robots
}

fn path_allowed(path: &str, rules: &Robots) -> bool {
    // longest matching rule wins; Allow wins ties
    let longest = |rules: &[String]| {
        rules.iter().filter(|r| path.starts_with(r.as_str())).map(String::len).max()
    };
    match (longest(&rules.allows), longest(&rules.disallows)) {
        (Some(a), Some(d)) => a >= d,
        (_, None) => true,
        (None, Some(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROBOTS: &str = "User-agent: Googlebot
Disallow: /

User-agent: *
Disallow: /cart
Allow: /cart/public # open
Crawl-delay: 2.5
";

    fn crawler(priority: &str, same_host: Option<&str>) -> Crawler {
        Crawler {
            client: Client::new(),
            robots: Robots::default(),
            delay: Duration::ZERO,
            priority_word: priority.into(),
            same_host: same_host.map(str::to_string),
            queue: VecDeque::new(),
            visited: HashSet::new(),
        }
    }

    fn urls(v: &[&str]) -> Vec<Url> {
        v.iter().map(|s| Url::parse(s).unwrap()).collect()
    }

    #[test]
    fn robots_star_group_only() {
        let r = parse_robots(ROBOTS);
        assert_eq!(r.disallows, vec!["/cart"]);
        assert_eq!(r.allows, vec!["/cart/public"]);
        assert_eq!(r.crawl_delay_ms, Some(2500));
    }

    #[test]
    fn longest_rule_decides() {
        let r = parse_robots(ROBOTS);
        assert!(path_allowed("/product/1", &r));
        assert!(!path_allowed("/cart/checkout", &r));
        assert!(path_allowed("/cart/public/list", &r));
        assert!(path_allowed("/anything", &Robots::default()));
    }

    #[test]
    fn priority_links_jump_the_queue_in_page_order() {
        let mut c = crawler("product", None);
        c.queue.extend(urls(&["https://shop.test/queued"]));
        c.enqueue(urls(&[
            "https://shop.test/about",
            "https://shop.test/product/1",
            "https://shop.test/blog",
            "https://shop.test/Product/2",
            "https://shop.test/product/3",
        ]));
        let order: Vec<&str> = c.queue.iter().map(Url::as_str).collect();
        assert_eq!(
            order,
            vec![
                "https://shop.test/product/1",
                "https://shop.test/product/3",
                "https://shop.test/queued",
                "https://shop.test/about",
                "https://shop.test/blog",
                "https://shop.test/Product/2",
            ]
        );
    }

    #[test]
    fn same_host_filter_drops_foreign_links() {
        let mut c = crawler("product", Some("shop.test"));
        c.enqueue(urls(&["https://other.test/product/1", "https://shop.test/product/2"]));
        assert_eq!(c.queue.len(), 1);
        assert_eq!(c.queue[0].as_str(), "https://shop.test/product/2");
    }

    #[test]
    fn extracts_title_paragraph_and_unique_links() {
        let url = Url::parse("https://shop.test/product/1").unwrap();
        let html = r#"<html><head><title> Test Page </title></head><body>
            <p>Hello World</p><p>second</p>
            <a href="/product/2">a</a><a href="/product/2#reviews">b</a>
            <a href="https://shop.test/about">c</a><a href="mailto:x@y.z">d</a><a>e</a>
            </body></html>"#;
        let page = extract_page(&url, html);
        assert_eq!(page.title, "Test Page");
        assert_eq!(page.first_paragraph, "Hello World");
        assert_eq!(page.links, vec!["https://shop.test/product/2", "https://shop.test/about"]);
        assert_eq!(page.url, "https://shop.test/product/1");
    }
}
