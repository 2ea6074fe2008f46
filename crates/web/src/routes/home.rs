//! Home page and tag search.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;
use vibehive_core::PostTag;
use vibehive_core::models::PostSort;

use crate::filters;
use crate::services::forum;
use crate::state::AppState;
use crate::views::{PageContext, PostCard};

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub tag: Option<String>,
    pub sort: Option<String>,
}

impl ListingQuery {
    fn sort(&self) -> PostSort {
        self.sort
            .as_deref()
            .and_then(|sort| sort.parse().ok())
            .unwrap_or_default()
    }

    fn tag(&self) -> Option<&str> {
        self.tag
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }
}

/// Sort option for the select box.
#[derive(Clone)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Tag chip for the filter bar.
#[derive(Clone)]
pub struct TagChip {
    pub value: String,
    pub label: String,
    pub active: bool,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub ctx: PageContext,
    pub heading: String,
    /// Form target for sort changes, `/` or `/search`.
    pub action: &'static str,
    pub active_tag: String,
    pub posts: Vec<PostCard>,
    pub tags: Vec<TagChip>,
    pub sorts: Vec<SortOption>,
    pub load_error: bool,
}

fn sort_options(current: PostSort) -> Vec<SortOption> {
    PostSort::ALL
        .iter()
        .map(|sort| SortOption {
            value: sort.as_str(),
            label: sort.label(),
            selected: *sort == current,
        })
        .collect()
}

/// Filter chips: tags configured by admins, or the fixed set when none are.
async fn tag_chips(state: &AppState, active: Option<&str>) -> Vec<TagChip> {
    let names: Vec<String> = match state.api().list_tags().await {
        Ok(tags) if !tags.is_empty() => tags.into_iter().map(|tag| tag.name).collect(),
        Ok(_) => PostTag::ALL.iter().map(|tag| tag.as_str().to_string()).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load tags");
            PostTag::ALL.iter().map(|tag| tag.as_str().to_string()).collect()
        }
    };

    names
        .into_iter()
        .map(|name| TagChip {
            active: active.is_some_and(|active| active.eq_ignore_ascii_case(&name)),
            label: name
                .parse::<PostTag>()
                .map_or_else(|_| name.clone(), |tag| tag.label().to_string()),
            value: name,
        })
        .collect()
}

/// Display the home page.
#[instrument(skip(state, ctx))]
pub async fn index(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let sort = query.sort();
    let tag = query.tag();

    let (listing, tags) = futures::join!(
        forum::load_home(state.api(), tag, sort),
        tag_chips(&state, tag),
    );

    let (posts, load_error) = match listing {
        Ok(listing) => (PostCard::from_listing(&listing), false),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load posts");
            (Vec::new(), true)
        }
    };

    HomeTemplate {
        ctx,
        heading: tag.map_or_else(|| "Latest Posts".to_string(), |tag| format!("Posts tagged \"{tag}\"")),
        action: "/",
        active_tag: tag.unwrap_or_default().to_string(),
        posts,
        tags,
        sorts: sort_options(sort),
        load_error,
    }
}

/// Display posts found by the tag search.
#[instrument(skip(state, ctx))]
pub async fn search(
    State(state): State<AppState>,
    ctx: PageContext,
    Query(query): Query<ListingQuery>,
) -> Response {
    let Some(tag) = query.tag() else {
        return Redirect::to("/").into_response();
    };
    let sort = query.sort();

    let (listing, tags) = futures::join!(
        forum::search(state.api(), tag, sort),
        tag_chips(&state, Some(tag)),
    );

    let (posts, load_error) = match listing {
        Ok(listing) => (PostCard::from_listing(&listing), false),
        Err(e) if e.is_not_found() => (Vec::new(), false),
        Err(e) => {
            tracing::warn!(error = %e, "Tag search failed");
            (Vec::new(), true)
        }
    };

    HomeTemplate {
        ctx,
        heading: format!("Search results for \"{tag}\""),
        action: "/search",
        active_tag: tag.to_string(),
        posts,
        tags,
        sorts: sort_options(sort),
        load_error,
    }
    .into_response()
}
