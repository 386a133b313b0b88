// src/common/response.rs

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

// Envelope padrão: { success, message, data }
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_message("Success", data)
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

// Envelope das listagens: { items, total, page, size, pages }
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PageParams) -> Self {
        let size = params.size();
        let pages = if total <= 0 {
            0
        } else {
            ((total as u64).div_ceil(size as u64)) as u32
        };
        Self {
            items,
            total,
            page: params.page(),
            size,
            pages,
        }
    }
}

/// Parâmetros de paginação (`?page=1&size=10`).
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    #[validate(range(min = 1, message = "A página começa em 1."))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "O tamanho da página deve estar entre 1 e 100."))]
    pub size: Option<u32>,
}

impl PageParams {
    pub const DEFAULT_SIZE: u32 = 10;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn size(&self) -> u32 {
        self.size.unwrap_or(Self::DEFAULT_SIZE).clamp(1, 100)
    }

    pub fn limit(&self) -> i64 {
        self.size() as i64
    }

    pub fn offset(&self) -> i64 {
        ((self.page() - 1) * self.size()) as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_defaults_and_offset() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.size(), 10);
        assert_eq!(params.offset(), 0);

        let params = PageParams { page: Some(3), size: Some(20) };
        assert_eq!(params.offset(), 40);
        assert_eq!(params.limit(), 20);
    }

    #[test]
    fn pages_round_up() {
        let params = PageParams { page: Some(1), size: Some(10) };
        let page: Paginated<u8> = Paginated::new(vec![], 21, &params);
        assert_eq!(page.pages, 3);

        let empty: Paginated<u8> = Paginated::new(vec![], 0, &params);
        assert_eq!(empty.pages, 0);
    }

    #[test]
    fn oversized_page_is_rejected_by_validation() {
        let params = PageParams { page: Some(1), size: Some(500) };
        assert!(params.validate().is_err());
    }
}
