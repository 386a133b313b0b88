// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

// Nosso tipo de erro, agora com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Regras de negócio que não cabem num campo específico
    #[error("{0}")]
    InvalidInput(String),

    #[error("Não autenticado")]
    NotAuthenticated,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Conta desativada")]
    AccountDisabled,

    #[error("Permissão '{0}' necessária")]
    Forbidden(String),

    #[error("Cargos de sistema não podem ser alterados")]
    SystemRoleImmutable,

    #[error("O cargo '{0}' não permite a criação de usuários")]
    RoleNotAssignable(String),

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Corpo padrão das respostas de erro.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    pub error_code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Vec<String>>>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotAuthenticated | AppError::InvalidToken | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::AccountDisabled
            | AppError::Forbidden(_)
            | AppError::SystemRoleImmutable
            | AppError::RoleNotAssignable(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => "VALIDATION_ERROR",
            AppError::NotAuthenticated => "NOT_AUTHENTICATED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::AccountDisabled => "ACCOUNT_DISABLED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::SystemRoleImmutable => "SYSTEM_ROLE_IMMUTABLE",
            AppError::RoleNotAssignable(_) => "ROLE_NOT_ASSIGNABLE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            _ => "INTERNAL_ERROR",
        }
    }

    /// Converte violação de chave única em `Conflict`, mantendo os demais erros.
    pub fn from_unique_violation(e: sqlx::Error, message: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Conflict(message.into());
            }
        }
        e.into()
    }

    /// Estouro de coluna INTEGER (SQLSTATE 22003) vira erro de entrada.
    pub fn from_out_of_range(e: sqlx::Error, message: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.code().as_deref() == Some("22003") {
                return AppError::InvalidInput(message.into());
            }
        }
        e.into()
    }

    /// Linha ainda referenciada por outra tabela vira `Conflict`.
    pub fn from_foreign_key_violation(e: sqlx::Error, message: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_foreign_key_violation() {
                return AppError::Conflict(message.into());
            }
        }
        e.into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_code = self.error_code();

        let (message, details) = match self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ("Um ou mais campos são inválidos.".to_string(), Some(details))
            }
            AppError::NotAuthenticated => ("Autenticação necessária.".to_string(), None),
            AppError::InvalidToken => (
                "Token de autenticação inválido ou expirado.".to_string(),
                None,
            ),
            AppError::InvalidCredentials => ("E-mail ou senha inválidos.".to_string(), None),
            AppError::Forbidden(code) => (
                format!("Você precisa da permissão '{}' para realizar esta ação.", code),
                None,
            ),

            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            // O `tracing` loga a mensagem detalhada; o cliente recebe uma genérica.
            ref e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                ("Ocorreu um erro inesperado.".to_string(), None)
            }
            e => (e.to_string(), None),
        };

        let body = Json(ErrorBody {
            success: false,
            message,
            error_code,
            details,
        });
        (status, body).into_response()
    }
}
