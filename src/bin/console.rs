#![cfg(not(tarpaulin_include))]

use catalog_admin::client::CatalogClient;
use catalog_admin::config::AdminConfig;
use catalog_admin::delete_flow::{DeleteFlow, DeleteOutcome};
use catalog_admin::listing::{CategoryListing, ListingQuery, StatusFilter};
use catalog_admin::records::TaxonomyRow;
use catalog_admin::saving::{Snapshot, load_snapshot, save_snapshot};
use catalog_admin::{downloader, taxonomy};
use clap::Parser;
use std::collections::HashSet;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

enum Source {
    Api(CatalogClient),
    Offline(PathBuf),
}

impl Source {
    fn label(&self) -> String {
        match self {
            Source::Api(client) => client.base_url().to_string(),
            Source::Offline(path) => path.display().to_string(),
        }
    }

    async fn fetch(&self) -> catalog_admin::Result<Vec<TaxonomyRow>> {
        match self {
            Source::Api(client) => client.list_categories().await,
            Source::Offline(path) => Ok(load_snapshot(path)?.rows),
        }
    }
}

struct Screen {
    source: Source,
    rows: Vec<TaxonomyRow>,
    listing: CategoryListing,
    expanded: HashSet<i64>,
    query: ListingQuery,
    delete: DeleteFlow,
    error: Option<String>,
}

impl Screen {
    async fn reload(&mut self) {
        match self.source.fetch().await {
            Ok(rows) => {
                self.listing = CategoryListing::new(&rows);
                self.rows = rows;
                self.error = None;
            }
            Err(e) => {
                // Keep whatever was loaded before.
                self.error = Some(format!("Failed to load categories: {}", e));
            }
        }
    }

    fn display(&self) {
        println!();
        if let Some(error) = &self.error {
            println!("!! {}", error);
        }
        let hidden = self.listing.forest().hidden_count();
        if hidden > 0 {
            println!("!! {} categories are hidden because a parent row is missing", hidden);
        }

        let page = self.listing.view(&self.expanded, &self.query);
        for row in &page.items {
            let marker = match (row.has_children, row.expanded) {
                (false, _) => ' ',
                (true, true) => '-',
                (true, false) => '+',
            };
            println!(
                "{:>6}  {}{} {:<40} {:<30} {}",
                row.id,
                "  ".repeat(row.level),
                marker,
                row.name,
                row.url,
                if row.active { "active" } else { "inactive" }
            );
        }
        if page.items.is_empty() {
            println!("  No categories found.");
        }
        println!(
            "page {} of {} | {} categories | search '{}' | status {}",
            page.page, page.total_pages, page.total_items, self.query.search, self.query.status
        );
    }

    fn total_pages(&self) -> usize {
        self.listing.view(&self.expanded, &self.query).total_pages
    }

    async fn view(&self, id: i64) -> String {
        match &self.source {
            Source::Api(client) => match client.get_category(id).await {
                Ok(detail) => {
                    let levels = [
                        &detail.dept,
                        &detail.typ,
                        &detail.subtyp1,
                        &detail.subtyp2,
                        &detail.subtyp3,
                    ];
                    let path: Vec<&str> = levels
                        .iter()
                        .map(|level| level.as_str())
                        .filter(|level| !taxonomy::is_unset(level))
                        .collect();
                    println!("id:          {}", detail.id);
                    println!("path:        {}", path.join(" > "));
                    println!("url:         {}", detail.url);
                    println!("active:      {}", detail.active);
                    println!("short desc:  {}", detail.short_desc.as_deref().unwrap_or("-"));
                    println!("description: {}", detail.long_description.as_deref().unwrap_or("-"));
                    println!("meta tags:   {}", detail.meta_tags.as_deref().unwrap_or("-"));
                    println!(
                        "sort:        {}",
                        detail.sort_position.map_or("-".to_string(), |p| p.to_string())
                    );
                    println!("created:     {}", detail.created_at.as_deref().unwrap_or("-"));
                    println!("updated:     {}", detail.updated_at.as_deref().unwrap_or("-"));
                    String::from("ok")
                }
                Err(e) => e.to_string(),
            },
            Source::Offline(_) => match self.listing.forest().find(id) {
                Some(node) => {
                    println!("id:       {}", node.id);
                    println!("name:     {}", node.name);
                    println!("url:      {}", node.url);
                    println!("active:   {}", node.active);
                    println!("children: {}", node.children.len());
                    String::from("ok")
                }
                None => format!("category {} not found", id),
            },
        }
    }

    async fn delete_category(&mut self, id: i64) -> String {
        if let Err(e) = self.delete.request(id) {
            return e.to_string();
        }

        let name = self
            .listing
            .forest()
            .find(id)
            .map_or_else(|| id.to_string(), |node| node.name.clone());
        print!("Delete category '{}'? [y/N] ", name);
        let answer = read_command().unwrap_or_default();
        if !answer.eq_ignore_ascii_case("y") {
            return match self.delete.cancel() {
                Ok(()) => String::from("cancelled"),
                Err(e) => e.to_string(),
            };
        }

        let id = match self.delete.confirm() {
            Ok(id) => id,
            Err(e) => return e.to_string(),
        };
        println!("Deleting...");
        let result = match &self.source {
            Source::Api(client) => client.delete_category(id).await.map_err(|e| e.to_string()),
            Source::Offline(_) => Err(String::from("offline snapshots are read-only")),
        };

        match self.delete.finish(result) {
            Ok(DeleteOutcome::Refetch) => {
                self.reload().await;
                String::from("deleted")
            }
            Ok(DeleteOutcome::Notify(message)) => message,
            Err(e) => e.to_string(),
        }
    }
}

fn read_command() -> Option<String> {
    io::stdout().flush().ok()?;
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  open <id> / close <id>   Expand or collapse a category");
    println!("  expand-all / collapse-all");
    println!("  search <text>            Filter by name or URL (empty clears)");
    println!("  status <all|active|inactive>");
    println!("  page <n> / next / prev");
    println!("  view <id>                Show category details");
    println!("  delete <id>              Delete a category");
    println!("  refresh                  Reload from the source");
    println!("  save <file>              Save a snapshot for offline use");
    println!("  export <file>            Write the filtered list as CSV");
    println!("  q                        Quit");
}

fn parse_id(arg: &str) -> Option<i64> {
    arg.trim().parse().ok()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = AdminConfig::parse();
    let source = match &config.offline {
        Some(path) => Source::Offline(path.clone()),
        None => Source::Api(CatalogClient::new(&config.upstream, config.timeout())?),
    };

    let mut screen = Screen {
        source,
        rows: Vec::new(),
        listing: CategoryListing::default(),
        expanded: HashSet::new(),
        query: ListingQuery::default(),
        delete: DeleteFlow::new(),
        error: None,
    };
    screen.reload().await;

    let mut status = String::from("ok");
    let mut start_time = Instant::now();
    loop {
        screen.display();
        print!("[{:.1}] ({}) > ", start_time.elapsed().as_secs_f64(), status);

        let Some(command) = read_command() else {
            break;
        };
        start_time = Instant::now();

        let (verb, arg) = match command.split_once(' ') {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (command.as_str(), ""),
        };

        status = match verb {
            "q" | "quit" => break,
            "help" => {
                print_help();
                String::from("ok")
            }
            "open" | "close" => match parse_id(arg) {
                Some(id) => {
                    if verb == "open" {
                        screen.expanded.insert(id);
                    } else {
                        screen.expanded.remove(&id);
                    }
                    String::from("ok")
                }
                None => String::from("invalid id"),
            },
            "expand-all" => {
                screen.expanded = taxonomy::all_ids(&screen.listing.forest().roots)
                    .into_iter()
                    .collect();
                String::from("ok")
            }
            "collapse-all" => {
                screen.expanded.clear();
                String::from("ok")
            }
            "search" => {
                screen.query.search = arg.to_string();
                screen.query.page = 1;
                String::from("ok")
            }
            "status" => match arg.parse::<StatusFilter>() {
                Ok(filter) => {
                    screen.query.status = filter;
                    screen.query.page = 1;
                    String::from("ok")
                }
                Err(e) => e.to_string(),
            },
            "page" => match arg.parse::<usize>() {
                Ok(page) => {
                    screen.query.page = page;
                    String::from("ok")
                }
                Err(_) => String::from("invalid page"),
            },
            "next" => {
                if screen.query.page < screen.total_pages() {
                    screen.query.page += 1;
                }
                String::from("ok")
            }
            "prev" => {
                screen.query.page = screen.query.page.saturating_sub(1).max(1);
                String::from("ok")
            }
            "view" => match parse_id(arg) {
                Some(id) => screen.view(id).await,
                None => String::from("invalid id"),
            },
            "delete" => match parse_id(arg) {
                Some(id) => screen.delete_category(id).await,
                None => String::from("invalid id"),
            },
            "refresh" => {
                screen.reload().await;
                String::from("ok")
            }
            "save" if !arg.is_empty() => {
                let snapshot = Snapshot::new(screen.source.label(), screen.rows.clone());
                match save_snapshot(&snapshot, arg) {
                    Ok(()) => format!("saved {} rows", snapshot.rows.len()),
                    Err(e) => e.to_string(),
                }
            }
            "export" if !arg.is_empty() => {
                let csv = downloader::to_csv(&screen.listing.visible(&screen.expanded, &screen.query));
                match std::fs::write(arg, csv) {
                    Ok(()) => format!("exported to {}", arg),
                    Err(e) => e.to_string(),
                }
            }
            _ => String::from("invalid command"),
        };
    }

    Ok(())
}
