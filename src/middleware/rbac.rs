// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::rbac::{actions, RequiredAction},
    services::access::ResourceOwner,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn action() -> RequiredAction;
}

/// 2. O Extractor (Guardião) para recursos globais.
///
/// Recursos de armazém/loja checam o escopo no serviço, com o dono real.
pub struct RequirePermission<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = AuthenticatedUser::from_request_parts(parts, state).await?;
        caller.authorize(T::action(), ResourceOwner::GLOBAL)?;
        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermRolesView;
impl PermissionDef for PermRolesView {
    fn action() -> RequiredAction { actions::ROLES_VIEW }
}

pub struct PermRolesManage;
impl PermissionDef for PermRolesManage {
    fn action() -> RequiredAction { actions::ROLES_MANAGE }
}

pub struct PermMedicinesView;
impl PermissionDef for PermMedicinesView {
    fn action() -> RequiredAction { actions::MEDICINES_VIEW }
}

pub struct PermMedicinesCreate;
impl PermissionDef for PermMedicinesCreate {
    fn action() -> RequiredAction { actions::MEDICINES_CREATE }
}

pub struct PermMedicinesEdit;
impl PermissionDef for PermMedicinesEdit {
    fn action() -> RequiredAction { actions::MEDICINES_EDIT }
}
