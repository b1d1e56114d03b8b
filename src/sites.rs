//! Static table of known recipe sites.

use std::sync::LazyLock;

use serde::Serialize;

use crate::url::{host_matches_suffix, url_host};

/// How a site is searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSearch {
    /// The site has its own search page. `{query}` is replaced by the
    /// form-encoded query.
    OnSite { url_template: String },
    /// The site is only reachable through the search engine, restricted with
    /// `site:<site_host>`.
    Engine { site_host: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: String,
    pub source_name: String,
    pub source_license: String,
    pub source_attribution: String,
    pub host_suffixes: Vec<String>,
    pub search: Option<SiteSearch>,
    /// Search results are rendered client-side, so an empty on-site parse
    /// falls back to the search engine.
    pub client_rendered: bool,
}

impl Site {
    /// Host used to restrict engine queries to this site.
    pub fn primary_host(&self) -> &str {
        self.host_suffixes.first().map(String::as_str).unwrap_or_default()
    }
}

/// Source metadata attached to every scraped record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMeta {
    pub source_name: String,
    pub source_license: String,
    pub source_attribution: String,
}

fn site(
    id: &str,
    name: &str,
    suffix: &str,
    search: SiteSearch,
    client_rendered: bool,
) -> Site {
    Site {
        id: id.to_string(),
        source_name: name.to_string(),
        source_license: "proprietary".to_string(),
        source_attribution: name.to_string(),
        host_suffixes: vec![suffix.to_string()],
        search: Some(search),
        client_rendered,
    }
}

fn on_site(template: &str) -> SiteSearch {
    SiteSearch::OnSite {
        url_template: template.to_string(),
    }
}

fn via_engine(host: &str) -> SiteSearch {
    SiteSearch::Engine {
        site_host: host.to_string(),
    }
}

static SITES: LazyLock<Vec<Site>> = LazyLock::new(|| {
    vec![
        site(
            "marmiton",
            "Marmiton",
            "marmiton.org",
            on_site("https://www.marmiton.org/recettes/recherche.aspx?aqt={query}"),
            false,
        ),
        site(
            "750g",
            "750g",
            "750g.com",
            on_site("https://www.750g.com/recherche/?q={query}"),
            true,
        ),
        site(
            "cuisineaz",
            "CuisineAZ",
            "cuisineaz.com",
            on_site("https://www.cuisineaz.com/recettes/recherche_terme.aspx?recherche={query}"),
            true,
        ),
        site("ptitchef", "Ptitchef", "ptitchef.com", via_engine("ptitchef.com"), false),
        site(
            "cuisineactuelle",
            "Cuisine Actuelle",
            "cuisineactuelle.fr",
            via_engine("cuisineactuelle.fr"),
            false,
        ),
        site(
            "journaldesfemmes",
            "Journal des Femmes",
            "journaldesfemmes.fr",
            via_engine("cuisine.journaldesfemmes.fr"),
            false,
        ),
    ]
});

pub fn list_sites() -> &'static [Site] {
    &SITES
}

pub fn site_by_id(id: &str) -> Option<&'static Site> {
    SITES.iter().find(|s| s.id == id)
}

pub fn site_by_host(host: &str) -> Option<&'static Site> {
    SITES
        .iter()
        .find(|s| host_matches_suffix(host, &s.host_suffixes))
}

pub fn default_site_ids() -> Vec<String> {
    SITES.iter().map(|s| s.id.clone()).collect()
}

/// Source metadata for a recipe URL. Unknown hosts are attributed to the host
/// itself with an `unknown` license.
pub fn source_meta_for_url(url: &str) -> SourceMeta {
    let host = url_host(url).unwrap_or_else(|_| url.to_string());
    match site_by_host(&host) {
        Some(site) => SourceMeta {
            source_name: site.source_name.clone(),
            source_license: site.source_license.clone(),
            source_attribution: site.source_attribution.clone(),
        },
        None => SourceMeta {
            source_name: host.clone(),
            source_license: "unknown".to_string(),
            source_attribution: host,
        },
    }
}
