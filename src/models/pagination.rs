use serde::Serialize;
use url::form_urlencoded;

pub const PER_PAGE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than `desc` (any case) falls back to ascending.
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: String,
    pub order: SortDirection,
    pub page: i64,
}

impl ListQuery {
    pub fn new(search: impl Into<String>, order: SortDirection, page: i64) -> Self {
        Self {
            search: search.into(),
            order,
            page: page.max(1),
        }
    }

    /// Builds a query from raw request parameters; malformed values take their defaults.
    pub fn from_params(search: Option<&str>, order: Option<&str>, page: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);
        Self::new(
            search.unwrap_or_default(),
            SortDirection::parse_lenient(order),
            page,
        )
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(PER_PAGE)
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub current_page: i64,
    pub per_page: i64,
    pub total: i64,
    pub last_page: i64,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub path: String,
    pub first_page_url: String,
    pub last_page_url: String,
    pub prev_page_url: Option<String>,
    pub next_page_url: Option<String>,
    pub search: String,
    pub order: SortDirection,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, query: &ListQuery, path: &str) -> Self {
        let last_page = ((total + PER_PAGE - 1) / PER_PAGE).max(1);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let from = query.offset() + 1;
            (Some(from), Some(from + data.len() as i64 - 1))
        };
        let url_for = |page: i64| page_url(path, query, page);

        Self {
            current_page: query.page,
            per_page: PER_PAGE,
            total,
            last_page,
            from,
            to,
            path: path.to_string(),
            first_page_url: url_for(1),
            last_page_url: url_for(last_page),
            prev_page_url: (query.page > 1).then(|| url_for(query.page - 1)),
            next_page_url: (query.page < last_page).then(|| url_for(query.page + 1)),
            search: query.search.clone(),
            order: query.order,
            data,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            current_page: self.current_page,
            per_page: self.per_page,
            total: self.total,
            last_page: self.last_page,
            from: self.from,
            to: self.to,
            path: self.path,
            first_page_url: self.first_page_url,
            last_page_url: self.last_page_url,
            prev_page_url: self.prev_page_url,
            next_page_url: self.next_page_url,
            search: self.search,
            order: self.order,
        }
    }
}

fn page_url(path: &str, query: &ListQuery, page: i64) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    if !query.search.is_empty() {
        params.append_pair("search", &query.search);
    }
    params.append_pair("order", query.order.as_str());
    params.append_pair("page", &page.to_string());
    format!("{}?{}", path, params.finish())
}
