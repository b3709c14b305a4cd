// libs/booking-cell/src/services/queries.rs
use std::sync::Arc;

use reqwest::Method;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BookingError, BookingListItem, BookingListQuery, BookingListResponse, Pagination};
use crate::services::access::AccessScope;

/// Hard row cap for calendar-window queries, which are unbounded by page.
pub const CALENDAR_ROW_CAP: i64 = 500;

const DEFAULT_PAGE_LIMIT: i64 = 25;
const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPath {
    pub path: String,
    pub calendar_mode: bool,
    pub page: i64,
    pub limit: i64,
}

/// Build the scoped, filtered PostgREST read query over bookings and their
/// joined entities.
///
/// Two shapes: the default paginated list (newest first), and calendar mode
/// (both date bounds present) which is date-window-bounded, capped at
/// `CALENDAR_ROW_CAP` rows and ordered by ascending appointment time.
pub fn build_list_path(scope: &AccessScope, query: &BookingListQuery) -> ListPath {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    // Search filters parent rows on the embedded examinee, which requires an
    // inner join on that embed.
    let examinee_embed = if search.is_some() {
        "examinee:examinees!inner(id,first_name,last_name,email)"
    } else {
        "examinee:examinees(id,first_name,last_name,email)"
    };

    let mut parts = vec![format!(
        "select=*,specialist:specialists(id,first_name,last_name,user_id),referrer:referrers(id,name,email,organization_id),{}",
        examinee_embed
    )];

    match scope {
        AccessScope::Admin => {}
        AccessScope::Organization(org_id) => {
            parts.push(format!("organization_id=eq.{}", org_id));
        }
        AccessScope::Specialist(specialist_id) => {
            parts.push(format!("specialist_id=eq.{}", specialist_id));
        }
        AccessScope::Referrer(user_id) => {
            parts.push(format!("created_by=eq.{}", user_id));
        }
    }

    if let Some(status) = query.status {
        parts.push(format!("status=eq.{}", status));
    }
    if let Some(from_date) = query.from_date {
        let encoded = urlencoding::encode(&from_date.to_rfc3339()).into_owned();
        parts.push(format!("scheduled_at=gte.{}", encoded));
    }
    if let Some(to_date) = query.to_date {
        let encoded = urlencoding::encode(&to_date.to_rfc3339()).into_owned();
        parts.push(format!("scheduled_at=lte.{}", encoded));
    }
    if !query.specialist_ids.is_empty() {
        let ids: Vec<String> = query.specialist_ids.iter().map(|id| id.to_string()).collect();
        parts.push(format!("specialist_id=in.({})", ids.join(",")));
    }
    if let Some(term) = search {
        let encoded = urlencoding::encode(term).into_owned();
        parts.push(format!(
            "examinee.or=(first_name.ilike.*{e}*,last_name.ilike.*{e}*,email.ilike.*{e}*)",
            e = encoded
        ));
    }

    let calendar_mode = query.from_date.is_some() && query.to_date.is_some();
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    if calendar_mode {
        parts.push(format!("order=scheduled_at.asc&limit={}", CALENDAR_ROW_CAP));
    } else {
        parts.push(format!(
            "order=created_at.desc&limit={}&offset={}",
            limit,
            (page - 1) * limit
        ));
    }

    ListPath {
        path: format!("/rest/v1/bookings?{}", parts.join("&")),
        calendar_mode,
        page,
        limit,
    }
}

pub struct BookingQueryService {
    supabase: Arc<SupabaseClient>,
}

impl BookingQueryService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn list_bookings(
        &self,
        scope: &AccessScope,
        query: &BookingListQuery,
        auth_token: &str,
    ) -> Result<BookingListResponse, BookingError> {
        let list_path = build_list_path(scope, query);
        debug!("Listing bookings: {}", list_path.path);

        if list_path.calendar_mode {
            let items: Vec<BookingListItem> = self
                .supabase
                .request(Method::GET, &list_path.path, Some(auth_token), None)
                .await
                .map_err(|e| BookingError::Database(e.to_string()))?;

            return Ok(BookingListResponse {
                items,
                pagination: None,
            });
        }

        let (items, total) = self
            .supabase
            .request_with_count::<BookingListItem>(&list_path.path, Some(auth_token))
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;

        let total_pages = if total == 0 {
            0
        } else {
            (total + list_path.limit - 1) / list_path.limit
        };

        Ok(BookingListResponse {
            items,
            pagination: Some(Pagination {
                page: list_path.page,
                limit: list_path.limit,
                total,
                total_pages,
            }),
        })
    }
}
