// src/services/access.rs

//! Checagem de acesso por escopo.
//!
//! Um código `module.action.global` libera qualquer recurso. Os códigos
//! `.warehouse` e `.shop` só liberam recursos cujo armazém/loja dono é o
//! mesmo que está atribuído ao usuário. O super-admin passa sempre.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        auth::User,
        rbac::{PermissionCode, PermissionScope, RequiredAction, Role},
    },
};

/// Conjunto efetivo de permissões, recalculado a cada requisição.
#[derive(Debug, Clone, Default)]
pub struct EffectivePermissions {
    is_super_admin: bool,
    codes: BTreeSet<String>,
    parsed: Vec<PermissionCode>,
}

impl EffectivePermissions {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Cargo de sistema: recebe todos os códigos do registro.
    pub fn super_admin(all_codes: impl IntoIterator<Item = String>) -> Self {
        Self {
            is_super_admin: true,
            ..Self::from_codes(all_codes)
        }
    }

    pub fn from_codes(codes: impl IntoIterator<Item = String>) -> Self {
        let codes: BTreeSet<String> = codes.into_iter().collect();
        let parsed = codes
            .iter()
            .filter_map(|code| match code.parse::<PermissionCode>() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!("Ignorando código de permissão inválido: {}", e);
                    None
                }
            })
            .collect();
        Self {
            is_super_admin: false,
            codes,
            parsed,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.is_super_admin
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Códigos em ordem alfabética.
    pub fn codes(&self) -> Vec<String> {
        self.codes.iter().cloned().collect()
    }

    fn scopes_for(&self, required: RequiredAction) -> impl Iterator<Item = PermissionScope> + '_ {
        self.parsed
            .iter()
            .filter(move |code| code.matches(required.module, required.action))
            .map(|code| code.scope())
    }
}

/// Armazém/loja atribuídos ao usuário.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Assignment {
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
}

/// Dono de um recurso. Os dois campos vazios = recurso global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceOwner {
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
}

impl ResourceOwner {
    pub const GLOBAL: ResourceOwner = ResourceOwner {
        warehouse_id: None,
        shop_id: None,
    };

    pub fn warehouse(warehouse_id: Uuid) -> Self {
        Self {
            warehouse_id: Some(warehouse_id),
            shop_id: None,
        }
    }

    /// Uma loja também pertence ao armazém que a abastece.
    pub fn shop(shop_id: Uuid, warehouse_id: Option<Uuid>) -> Self {
        Self {
            warehouse_id,
            shop_id: Some(shop_id),
        }
    }
}

fn same_location(assigned: Option<Uuid>, owner: Option<Uuid>) -> bool {
    matches!((assigned, owner), (Some(a), Some(o)) if a == o)
}

pub fn is_allowed(
    permissions: &EffectivePermissions,
    assignment: Assignment,
    required: RequiredAction,
    owner: ResourceOwner,
) -> bool {
    if permissions.is_super_admin() {
        return true;
    }
    permissions.scopes_for(required).any(|scope| match scope {
        PermissionScope::Global => true,
        PermissionScope::Warehouse => same_location(assignment.warehouse_id, owner.warehouse_id),
        PermissionScope::Shop => same_location(assignment.shop_id, owner.shop_id),
    })
}

/// Conjunto de locais que o usuário pode listar para uma ação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeGrant {
    Global,
    Warehouse(Uuid),
    Shop(Uuid),
}

/// Filtro de local pedido por uma listagem (`?warehouse_id=&shop_id=`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationFilter {
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
}

impl ScopeGrant {
    /// Junta o filtro pedido com o escopo. Filtro fora do escopo é recusado.
    pub fn restrict(&self, requested: LocationFilter) -> Option<LocationFilter> {
        match *self {
            ScopeGrant::Global => Some(requested),
            ScopeGrant::Warehouse(id) => match requested.warehouse_id {
                Some(other) if other != id => None,
                _ => Some(LocationFilter {
                    warehouse_id: Some(id),
                    shop_id: requested.shop_id,
                }),
            },
            ScopeGrant::Shop(id) => match requested.shop_id {
                Some(other) if other != id => None,
                _ => Some(LocationFilter {
                    warehouse_id: requested.warehouse_id,
                    shop_id: Some(id),
                }),
            },
        }
    }
}

/// O escopo mais largo disponível. `None` quando nenhum código serve.
pub fn scope_grant(
    permissions: &EffectivePermissions,
    assignment: Assignment,
    required: RequiredAction,
) -> Option<ScopeGrant> {
    if permissions.is_super_admin() {
        return Some(ScopeGrant::Global);
    }
    let mut best: Option<ScopeGrant> = None;
    for scope in permissions.scopes_for(required) {
        let candidate = match scope {
            PermissionScope::Global => return Some(ScopeGrant::Global),
            PermissionScope::Warehouse => assignment.warehouse_id.map(ScopeGrant::Warehouse),
            PermissionScope::Shop => assignment.shop_id.map(ScopeGrant::Shop),
        };
        best = match (best, candidate) {
            (Some(ScopeGrant::Warehouse(id)), _) => Some(ScopeGrant::Warehouse(id)),
            (_, Some(c)) => Some(c),
            (b, None) => b,
        };
    }
    best
}

// ---
// O usuário autenticado, com o cargo e as permissões já resolvidos
// ---
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub role: Option<Role>,
    pub permissions: EffectivePermissions,
}

impl Caller {
    pub fn assignment(&self) -> Assignment {
        Assignment {
            warehouse_id: self.user.assigned_warehouse_id,
            shop_id: self.user.assigned_shop_id,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.permissions.is_super_admin()
    }

    pub fn can(&self, required: RequiredAction, owner: ResourceOwner) -> bool {
        is_allowed(&self.permissions, self.assignment(), required, owner)
    }

    pub fn authorize(&self, required: RequiredAction, owner: ResourceOwner) -> Result<(), AppError> {
        if self.can(required, owner) {
            Ok(())
        } else {
            tracing::debug!(user_id = %self.user.id, permission = %required, "Acesso negado");
            Err(AppError::Forbidden(required.to_string()))
        }
    }

    pub fn scope_grant(&self, required: RequiredAction) -> Result<ScopeGrant, AppError> {
        scope_grant(&self.permissions, self.assignment(), required)
            .ok_or_else(|| AppError::Forbidden(required.to_string()))
    }

    /// Escopo + filtro pedido pela listagem.
    pub fn list_filter(
        &self,
        required: RequiredAction,
        requested: LocationFilter,
    ) -> Result<LocationFilter, AppError> {
        self.scope_grant(required)?
            .restrict(requested)
            .ok_or_else(|| AppError::Forbidden(required.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rbac::actions::{INVENTORY_ADJUST, INVENTORY_VIEW, USERS_VIEW};

    fn perms(codes: &[&str]) -> EffectivePermissions {
        EffectivePermissions::from_codes(codes.iter().map(|c| c.to_string()))
    }

    fn at_warehouse(id: Uuid) -> Assignment {
        Assignment {
            warehouse_id: Some(id),
            shop_id: None,
        }
    }

    #[test]
    fn warehouse_code_only_covers_the_assigned_warehouse() {
        let w = Uuid::new_v4();
        let other = Uuid::new_v4();
        let p = perms(&["inventory.adjust.warehouse"]);

        assert!(is_allowed(&p, at_warehouse(w), INVENTORY_ADJUST, ResourceOwner::warehouse(w)));
        assert!(!is_allowed(&p, at_warehouse(w), INVENTORY_ADJUST, ResourceOwner::warehouse(other)));
        assert!(!is_allowed(&p, at_warehouse(w), INVENTORY_ADJUST, ResourceOwner::GLOBAL));
        // Ação diferente no mesmo armazém
        assert!(!is_allowed(&p, at_warehouse(w), INVENTORY_VIEW, ResourceOwner::warehouse(w)));
    }

    #[test]
    fn unassigned_user_never_matches_scoped_codes() {
        let p = perms(&["inventory.view.warehouse", "inventory.view.shop"]);
        let owner = ResourceOwner {
            warehouse_id: None,
            shop_id: None,
        };
        assert!(!is_allowed(&p, Assignment::default(), INVENTORY_VIEW, owner));
        assert!(!is_allowed(
            &p,
            Assignment::default(),
            INVENTORY_VIEW,
            ResourceOwner::warehouse(Uuid::new_v4())
        ));
    }

    #[test]
    fn global_code_covers_everything() {
        let p = perms(&["inventory.view.global"]);
        assert!(is_allowed(&p, Assignment::default(), INVENTORY_VIEW, ResourceOwner::GLOBAL));
        assert!(is_allowed(
            &p,
            Assignment::default(),
            INVENTORY_VIEW,
            ResourceOwner::shop(Uuid::new_v4(), None)
        ));

        let p = perms(&["users.view"]);
        assert!(is_allowed(&p, Assignment::default(), USERS_VIEW, ResourceOwner::warehouse(Uuid::new_v4())));
    }

    #[test]
    fn shop_code_matches_shop_and_warehouse_code_matches_parent() {
        let w = Uuid::new_v4();
        let s = Uuid::new_v4();
        let shop_owner = ResourceOwner::shop(s, Some(w));

        let shop_user = Assignment {
            warehouse_id: None,
            shop_id: Some(s),
        };
        assert!(is_allowed(&perms(&["inventory.view.shop"]), shop_user, INVENTORY_VIEW, shop_owner));
        assert!(!is_allowed(
            &perms(&["inventory.view.shop"]),
            shop_user,
            INVENTORY_VIEW,
            ResourceOwner::shop(Uuid::new_v4(), Some(w))
        ));

        assert!(is_allowed(&perms(&["inventory.view.warehouse"]), at_warehouse(w), INVENTORY_VIEW, shop_owner));
    }

    #[test]
    fn empty_set_denies_and_super_admin_allows() {
        let w = Uuid::new_v4();
        let empty = EffectivePermissions::empty();
        assert!(!is_allowed(&empty, at_warehouse(w), INVENTORY_VIEW, ResourceOwner::warehouse(w)));
        assert_eq!(scope_grant(&empty, at_warehouse(w), INVENTORY_VIEW), None);

        let admin = EffectivePermissions::super_admin(Vec::new());
        assert!(is_allowed(&admin, Assignment::default(), INVENTORY_ADJUST, ResourceOwner::warehouse(w)));
        assert_eq!(
            scope_grant(&admin, Assignment::default(), INVENTORY_ADJUST),
            Some(ScopeGrant::Global)
        );
    }

    #[test]
    fn scope_grant_prefers_the_widest_scope() {
        let w = Uuid::new_v4();
        let s = Uuid::new_v4();
        let both = Assignment {
            warehouse_id: Some(w),
            shop_id: Some(s),
        };

        let p = perms(&["inventory.view.shop", "inventory.view.warehouse"]);
        assert_eq!(scope_grant(&p, both, INVENTORY_VIEW), Some(ScopeGrant::Warehouse(w)));

        let p = perms(&["inventory.view.shop", "inventory.view.global"]);
        assert_eq!(scope_grant(&p, both, INVENTORY_VIEW), Some(ScopeGrant::Global));

        let p = perms(&["inventory.view.shop"]);
        assert_eq!(scope_grant(&p, both, INVENTORY_VIEW), Some(ScopeGrant::Shop(s)));

        // Código de armazém sem armazém atribuído não dá escopo nenhum
        let p = perms(&["inventory.view.warehouse"]);
        assert_eq!(scope_grant(&p, Assignment::default(), INVENTORY_VIEW), None);
    }

    #[test]
    fn restrict_rejects_filters_outside_the_grant() {
        let w = Uuid::new_v4();
        let grant = ScopeGrant::Warehouse(w);

        assert_eq!(
            grant.restrict(LocationFilter::default()),
            Some(LocationFilter {
                warehouse_id: Some(w),
                shop_id: None
            })
        );
        assert_eq!(
            grant.restrict(LocationFilter {
                warehouse_id: Some(Uuid::new_v4()),
                shop_id: None
            }),
            None
        );

        let requested = LocationFilter {
            warehouse_id: Some(Uuid::new_v4()),
            shop_id: None,
        };
        assert_eq!(ScopeGrant::Global.restrict(requested), Some(requested));

        let s = Uuid::new_v4();
        assert_eq!(
            ScopeGrant::Shop(s).restrict(LocationFilter {
                warehouse_id: None,
                shop_id: Some(Uuid::new_v4())
            }),
            None
        );
    }

    #[test]
    fn invalid_codes_are_ignored() {
        let p = perms(&["not a code", "inventory.view.global"]);
        assert!(p.contains("not a code"));
        assert!(is_allowed(&p, Assignment::default(), INVENTORY_VIEW, ResourceOwner::GLOBAL));
    }
}
