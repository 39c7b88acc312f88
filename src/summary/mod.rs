//! Default commit messages synthesized from config changes.

use crate::models::SiteConfig;

pub const INITIAL_MESSAGE: &str = "Initial site configuration";
pub const GENERIC_MESSAGE: &str = "Update site configuration";
const CLAUSE_PREFIX: &str = "Update site config - ";

/// Summarize what changed between two snapshots.
///
/// Sections are compared by structural equality in a fixed order, so the same
/// pair of snapshots always yields the same message.
pub fn summarize_change(previous: Option<&SiteConfig>, next: &SiteConfig) -> String {
    let Some(previous) = previous else {
        return INITIAL_MESSAGE.to_string();
    };

    let mut clauses = Vec::new();

    if previous.wine_menu != next.wine_menu {
        clauses.push(count_clause(
            previous.wine_count(),
            next.wine_count(),
            "new wine",
            "wine",
            "updated wine menu",
        ));
    }

    if previous.business.hours != next.business.hours {
        clauses.push("updated opening hours".to_string());
    }

    if previous.events != next.events {
        clauses.push(count_clause(
            previous.events.len(),
            next.events.len(),
            "new event",
            "event",
            "updated event details",
        ));
    }

    if previous.location != next.location {
        clauses.push("updated contact info".to_string());
    }

    if previous.faq != next.faq {
        clauses.push("updated FAQ".to_string());
    }

    if previous.about != next.about {
        clauses.push("updated about section".to_string());
    }

    if clauses.is_empty() {
        GENERIC_MESSAGE.to_string()
    } else {
        format!("{}{}", CLAUSE_PREFIX, clauses.join(", "))
    }
}

/// "added N new wines" / "removed N wines" / the fallback when counts match.
fn count_clause(before: usize, after: usize, added: &str, removed: &str, same: &str) -> String {
    if after > before {
        let n = after - before;
        format!("added {} {}{}", n, added, plural(n))
    } else if before > after {
        let n = before - after;
        format!("removed {} {}{}", n, removed, plural(n))
    } else {
        same.to_string()
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
