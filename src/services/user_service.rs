// src/services/user_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        response::{PageParams, Paginated},
    },
    db::{user_repo::NewUser, OrganizationRepository, RbacRepository, SessionRepository, UserRepository},
    models::{
        auth::{CreateUserPayload, UpdateUserPayload, User, UserFilter},
        rbac::{actions, Role, RoleEntityType},
    },
    services::{
        access::{Caller, LocationFilter, ResourceOwner},
        auth::hash_password,
    },
};

// Dono de um usuário = o local atribuído a ele
fn owner_of(warehouse_id: Option<Uuid>, shop_id: Option<Uuid>) -> ResourceOwner {
    ResourceOwner {
        warehouse_id,
        shop_id,
    }
}

/// Local de um usuário já conferido no banco: a loja traz o armazém que a abastece.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    pub warehouse_id: Option<Uuid>,
    pub shop_id: Option<Uuid>,
}

/// Alcance que o cargo dá ao usuário no local. É sobre ele que o chamador
/// precisa ter permissão: cargo de armazém alcança o armazém inteiro e cargo
/// sem tipo alcança tudo.
fn reach_of(role: &Role, placement: Placement) -> ResourceOwner {
    match role.entity_type {
        Some(RoleEntityType::Warehouse) => owner_of(placement.warehouse_id, None),
        Some(RoleEntityType::Shop) => owner_of(placement.warehouse_id, placement.shop_id),
        None => ResourceOwner::GLOBAL,
    }
}

/// Um cargo de armazém exige armazém atribuído; de loja, loja.
fn check_assignment(role: &Role, placement: Placement) -> Result<(), AppError> {
    match role.entity_type {
        Some(RoleEntityType::Warehouse) if placement.warehouse_id.is_none() => Err(AppError::InvalidInput(
            format!("O cargo '{}' exige um armazém atribuído.", role.name),
        )),
        Some(RoleEntityType::Shop) if placement.shop_id.is_none() => Err(AppError::InvalidInput(format!(
            "O cargo '{}' exige uma loja atribuída.",
            role.name
        ))),
        _ => Ok(()),
    }
}

fn check_creatable(caller: &Caller, role: &Role) -> Result<(), AppError> {
    if role.is_creatable || caller.is_super_admin() {
        Ok(())
    } else {
        Err(AppError::RoleNotAssignable(role.name.clone()))
    }
}

#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    rbac_repo: RbacRepository,
    org_repo: OrganizationRepository,
    session_repo: SessionRepository,
    pool: PgPool,
}

impl UserService {
    pub fn new(
        user_repo: UserRepository,
        rbac_repo: RbacRepository,
        org_repo: OrganizationRepository,
        session_repo: SessionRepository,
        pool: PgPool,
    ) -> Self {
        Self {
            user_repo,
            rbac_repo,
            org_repo,
            session_repo,
            pool,
        }
    }

    pub async fn list_users(
        &self,
        caller: &Caller,
        filter: UserFilter,
        page: PageParams,
    ) -> Result<Paginated<User>, AppError> {
        let location = caller.list_filter(
            actions::USERS_VIEW,
            LocationFilter {
                warehouse_id: filter.warehouse_id,
                shop_id: filter.shop_id,
            },
        )?;
        let (items, total) = self.user_repo.list(&filter, location, &page).await?;
        Ok(Paginated::new(items, total, &page))
    }

    pub async fn get_user(&self, caller: &Caller, id: Uuid) -> Result<User, AppError> {
        let user = self.find(id).await?;
        caller.authorize(
            actions::USERS_VIEW,
            owner_of(user.assigned_warehouse_id, user.assigned_shop_id),
        )?;
        Ok(user)
    }

    pub async fn create_user(&self, caller: &Caller, payload: CreateUserPayload) -> Result<User, AppError> {
        let role = self.find_role(payload.role_id).await?;
        let placement = self
            .placement(payload.assigned_warehouse_id, payload.assigned_shop_id)
            .await?;
        check_assignment(&role, placement)?;
        caller.authorize(actions::USERS_CREATE, reach_of(&role, placement))?;
        check_creatable(caller, &role)?;

        let password_hash = hash_password(&payload.password).await?;
        let user = self
            .user_repo
            .create_user(
                &self.pool,
                NewUser {
                    email: payload.email.trim(),
                    password_hash: &password_hash,
                    full_name: payload.full_name.trim(),
                    phone: payload.phone.as_deref(),
                    legacy_role: None,
                    role_id: role.id,
                    assigned_warehouse_id: placement.warehouse_id,
                    assigned_shop_id: placement.shop_id,
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, role = %role.name, created_by = %caller.user.id, "Usuário criado");
        Ok(user)
    }

    pub async fn update_user(
        &self,
        caller: &Caller,
        id: Uuid,
        payload: UpdateUserPayload,
    ) -> Result<User, AppError> {
        let current = self.find(id).await?;
        caller.authorize(
            actions::USERS_EDIT,
            owner_of(current.assigned_warehouse_id, current.assigned_shop_id),
        )?;

        if payload.is_active == Some(false) && id == caller.user.id {
            return Err(AppError::InvalidInput("Você não pode desativar a própria conta.".into()));
        }

        let current_placement = Placement {
            warehouse_id: current.assigned_warehouse_id,
            shop_id: current.assigned_shop_id,
        };
        // Loja nova define o armazém; armazém novo sem loja tira o usuário da loja
        let placement = match (payload.assigned_warehouse_id, payload.assigned_shop_id) {
            (warehouse_id, Some(shop_id)) => self.placement(warehouse_id, Some(shop_id)).await?,
            (Some(warehouse_id), None) => self.placement(Some(warehouse_id), None).await?,
            (None, None) => current_placement,
        };

        let role_change = payload.role_id.filter(|r| Some(*r) != current.role_id);
        if placement != current_placement || role_change.is_some() {
            let role = match role_change.or(current.role_id) {
                Some(role_id) => Some(self.find_role(role_id).await?),
                None => None,
            };
            match &role {
                Some(role) => {
                    check_assignment(role, placement)?;
                    caller.authorize(actions::USERS_EDIT, reach_of(role, placement))?;
                }
                // Usuário antigo sem role_id: vale o local de destino
                None => caller.authorize(
                    actions::USERS_EDIT,
                    owner_of(placement.warehouse_id, placement.shop_id),
                )?,
            }
            if let (Some(role), Some(_)) = (&role, role_change) {
                check_creatable(caller, role)?;
            }
        }

        let user = self
            .user_repo
            .update_user(&self.pool, id, &payload, placement.warehouse_id, placement.shop_id)
            .await?;
        tracing::info!(user_id = %user.id, updated_by = %caller.user.id, "Usuário atualizado");
        Ok(user)
    }

    /// Exclusão lógica: desativa e derruba as sessões.
    pub async fn deactivate_user(&self, caller: &Caller, id: Uuid) -> Result<(), AppError> {
        let user = self.find(id).await?;
        caller.authorize(
            actions::USERS_DELETE,
            owner_of(user.assigned_warehouse_id, user.assigned_shop_id),
        )?;
        if id == caller.user.id {
            return Err(AppError::InvalidInput("Você não pode desativar a própria conta.".into()));
        }

        let mut tx = self.pool.begin().await?;
        self.user_repo.deactivate(&mut *tx, id).await?;
        self.session_repo.delete_user_sessions(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %id, deactivated_by = %caller.user.id, "Usuário desativado");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Usuário"))
    }

    async fn find_role(&self, id: Uuid) -> Result<Role, AppError> {
        self.rbac_repo
            .find_role_by_id(self.rbac_repo.pool(), id)
            .await?
            .ok_or(AppError::NotFound("Cargo"))
    }

    /// Confere os locais pedidos. Com loja, o armazém vem da própria loja e um
    /// armazém informado precisa ser o dela.
    async fn placement(&self, warehouse_id: Option<Uuid>, shop_id: Option<Uuid>) -> Result<Placement, AppError> {
        if let Some(shop_id) = shop_id {
            let shop = self.org_repo.find_shop(shop_id).await?.ok_or(AppError::NotFound("Loja"))?;
            if warehouse_id.is_some() && warehouse_id != shop.warehouse_id {
                return Err(AppError::InvalidInput(
                    "A loja informada não pertence ao armazém informado.".into(),
                ));
            }
            return Ok(Placement {
                warehouse_id: shop.warehouse_id,
                shop_id: Some(shop.id),
            });
        }
        if let Some(id) = warehouse_id {
            if !self.org_repo.warehouse_exists(id).await? {
                return Err(AppError::NotFound("Armazém"));
            }
        }
        Ok(Placement {
            warehouse_id,
            shop_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::access::EffectivePermissions;
    use chrono::Utc;

    fn role(entity_type: Option<RoleEntityType>, is_creatable: bool) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            name: "pharmacy_employee".into(),
            description: None,
            entity_type,
            is_system: false,
            is_creatable,
            created_at: now,
            updated_at: now,
        }
    }

    fn caller(permissions: EffectivePermissions) -> Caller {
        let now = Utc::now();
        Caller {
            user: User {
                id: Uuid::new_v4(),
                email: "op@pharmacy.com".into(),
                password_hash: String::new(),
                full_name: "Operador".into(),
                phone: None,
                legacy_role: None,
                role_id: None,
                assigned_warehouse_id: None,
                assigned_shop_id: None,
                is_active: true,
                last_login: None,
                created_at: now,
                updated_at: now,
            },
            role: None,
            permissions,
        }
    }

    fn at(warehouse_id: Option<Uuid>, shop_id: Option<Uuid>) -> Placement {
        Placement { warehouse_id, shop_id }
    }

    #[test]
    fn scoped_roles_need_matching_assignment() {
        let shop_role = role(Some(RoleEntityType::Shop), true);
        assert!(check_assignment(&shop_role, at(Some(Uuid::new_v4()), None)).is_err());
        assert!(check_assignment(&shop_role, at(None, Some(Uuid::new_v4()))).is_ok());

        let wh_role = role(Some(RoleEntityType::Warehouse), true);
        assert!(check_assignment(&wh_role, at(None, None)).is_err());

        assert!(check_assignment(&role(None, true), at(None, None)).is_ok());
    }

    #[test]
    fn reach_follows_the_role_entity_type() {
        let (w1, s1) = (Uuid::new_v4(), Uuid::new_v4());
        let placed = at(Some(w1), Some(s1));

        assert_eq!(
            reach_of(&role(Some(RoleEntityType::Warehouse), true), placed),
            ResourceOwner::warehouse(w1)
        );
        assert_eq!(
            reach_of(&role(Some(RoleEntityType::Shop), true), placed),
            ResourceOwner::shop(s1, Some(w1))
        );
        assert_eq!(reach_of(&role(None, true), placed), ResourceOwner::GLOBAL);
    }

    #[test]
    fn shop_grant_cannot_mint_a_warehouse_wide_user() {
        let (w1, s1) = (Uuid::new_v4(), Uuid::new_v4());
        let mut shop_admin = caller(EffectivePermissions::from_codes(vec!["users.create.shop".to_string()]));
        shop_admin.user.assigned_warehouse_id = Some(w1);
        shop_admin.user.assigned_shop_id = Some(s1);

        let placed = at(Some(w1), Some(s1));
        let shop_role = role(Some(RoleEntityType::Shop), true);
        let wh_role = role(Some(RoleEntityType::Warehouse), true);

        assert!(shop_admin.authorize(actions::USERS_CREATE, reach_of(&shop_role, placed)).is_ok());
        assert!(matches!(
            shop_admin.authorize(actions::USERS_CREATE, reach_of(&wh_role, placed)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn only_super_admin_bypasses_is_creatable() {
        let locked = role(None, false);
        let operator = caller(EffectivePermissions::from_codes(vec!["users.create".to_string()]));
        assert!(matches!(
            check_creatable(&operator, &locked),
            Err(AppError::RoleNotAssignable(_))
        ));

        let admin = caller(EffectivePermissions::super_admin(Vec::new()));
        assert!(check_creatable(&admin, &locked).is_ok());
        assert!(check_creatable(&operator, &role(None, true)).is_ok());
    }
}
