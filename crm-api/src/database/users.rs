use rusqlite::{params, Connection, OptionalExtension, Row};
use shared_types::{now_millis, RoleCapabilities, UpsertUserRequest, User, UserRole};

use crate::database::rows::enum_column;
use crate::database::AsyncDbConnection;
use crate::error::CrmError;

const USER_COLUMNS: &str =
    "id, external_id, email, first_name, last_name, image_url, role, is_active, created_at, updated_at";

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        external_id: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        image_url: row.get(5)?,
        role: enum_column(row, 6)?,
        is_active: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>, CrmError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            [id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

pub fn fetch_by_external_id(conn: &Connection, external_id: &str) -> Result<Option<User>, CrmError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE external_id = ?1"),
            [external_id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

/// Create the user on first sign-in, otherwise refresh the profile.
/// An existing role is only replaced when the request names one.
pub async fn upsert_user(
    conn: AsyncDbConnection,
    request: &UpsertUserRequest,
) -> Result<User, CrmError> {
    if request.external_id.trim().is_empty() {
        return Err(CrmError::Validation(
            "External id cannot be empty".to_string(),
        ));
    }

    let conn = conn.lock().await?;
    let now = now_millis();

    // One statement: concurrent first sign-ins resolve to the same row
    let user = conn.query_row(
        &format!(
            "INSERT INTO users
             (external_id, email, first_name, last_name, image_url, role, is_active,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, COALESCE(?6, ?7), 1, ?8, ?8)
             ON CONFLICT(external_id) DO UPDATE SET
                 email = excluded.email,
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 image_url = excluded.image_url,
                 role = COALESCE(?6, users.role),
                 is_active = 1,
                 updated_at = excluded.updated_at
             RETURNING {USER_COLUMNS}"
        ),
        params![
            request.external_id,
            request.email,
            request.first_name,
            request.last_name,
            request.image_url,
            request.role.map(|r| r.as_str()),
            UserRole::default().as_str(),
            now
        ],
        map_user,
    )?;
    if user.created_at == now {
        tracing::info!("Registered user {} as {}", user.external_id, user.role);
    }

    Ok(user)
}

pub async fn get_user(conn: AsyncDbConnection, id: i64) -> Result<User, CrmError> {
    let conn = conn.lock().await?;
    fetch_user(&conn, id)?.ok_or_else(|| CrmError::not_found("User"))
}

/// `None` when no user has signed in with this identity yet.
pub async fn get_user_by_external_id(
    conn: AsyncDbConnection,
    external_id: &str,
) -> Result<Option<User>, CrmError> {
    let conn = conn.lock().await?;
    fetch_by_external_id(&conn, external_id)
}

pub async fn list_users(conn: AsyncDbConnection) -> Result<Vec<User>, CrmError> {
    let conn = conn.lock().await?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
    ))?;
    let users = stmt
        .query_map([], map_user)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Change a user's role on behalf of `acting_external_id`.
pub async fn update_user_role(
    conn: AsyncDbConnection,
    target_id: i64,
    acting_external_id: &str,
    role: UserRole,
) -> Result<User, CrmError> {
    let conn = conn.lock().await?;

    let acting = fetch_by_external_id(&conn, acting_external_id)?
        .filter(|u| u.is_active && RoleCapabilities::for_role(u.role).can_manage_users);
    let Some(acting) = acting else {
        tracing::warn!("{} attempted to change a role", acting_external_id);
        return Err(CrmError::PermissionDenied(
            "You do not have permission to manage users".to_string(),
        ));
    };

    if role == UserRole::Owner && acting.role != UserRole::Owner {
        return Err(CrmError::PermissionDenied(
            "Only owners can assign owner role".to_string(),
        ));
    }

    let updated = conn
        .query_row(
            &format!(
                "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3
                 RETURNING {USER_COLUMNS}"
            ),
            params![role.as_str(), now_millis(), target_id],
            map_user,
        )
        .optional()?
        .ok_or_else(|| CrmError::not_found("User"))?;

    tracing::info!(
        "User {} changed role of {} to {}",
        acting.external_id,
        updated.external_id,
        role
    );

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::test_database;

    fn sync_request(external_id: &str, role: Option<UserRole>) -> UpsertUserRequest {
        UpsertUserRequest {
            external_id: external_id.to_string(),
            email: format!("{external_id}@example.com"),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            image_url: None,
            role,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let (_dir, db) = test_database();

        let created = upsert_user(db.async_connection.clone(), &sync_request("ext_1", None))
            .await
            .unwrap();
        assert_eq!(created.role, UserRole::Sales);
        assert!(created.is_active);

        let mut changed = sync_request("ext_1", None);
        changed.email = "grace@navy.mil".to_string();
        let updated = upsert_user(db.async_connection.clone(), &changed).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.email, "grace@navy.mil");
        assert_eq!(updated.role, UserRole::Sales);

        assert_eq!(list_users(db.async_connection.clone()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_role_when_not_supplied() {
        let (_dir, db) = test_database();
        upsert_user(
            db.async_connection.clone(),
            &sync_request("ext_admin", Some(UserRole::Admin)),
        )
        .await
        .unwrap();

        let again = upsert_user(db.async_connection.clone(), &sync_request("ext_admin", None))
            .await
            .unwrap();
        assert_eq!(again.role, UserRole::Admin);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_sign_ins_share_one_user() {
        let (_dir, db) = test_database();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let conn = db.async_connection.clone();
                tokio::spawn(async move { upsert_user(conn, &sync_request("ext_race", None)).await })
            })
            .collect();
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(list_users(db.async_connection.clone()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_reactivates_user() {
        let (_dir, db) = test_database();
        let user = upsert_user(db.async_connection.clone(), &sync_request("ext_2", None))
            .await
            .unwrap();
        db.async_connection
            .lock()
            .await
            .unwrap()
            .execute("UPDATE users SET is_active = 0 WHERE id = ?1", [user.id])
            .unwrap();

        let again = upsert_user(db.async_connection.clone(), &sync_request("ext_2", None))
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
        assert!(again.is_active);
        assert_eq!(again.created_at, user.created_at);
    }

    #[tokio::test]
    async fn test_role_change_rules() {
        let (_dir, db) = test_database();
        let conn = db.async_connection.clone();

        upsert_user(conn.clone(), &sync_request("owner", Some(UserRole::Owner)))
            .await
            .unwrap();
        upsert_user(conn.clone(), &sync_request("admin", Some(UserRole::Admin)))
            .await
            .unwrap();
        let sales = upsert_user(conn.clone(), &sync_request("sales", None))
            .await
            .unwrap();

        let err = update_user_role(conn.clone(), sales.id, "sales", UserRole::Admin)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "You do not have permission to manage users");

        let err = update_user_role(conn.clone(), sales.id, "admin", UserRole::Owner)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Only owners can assign owner role");

        let promoted = update_user_role(conn.clone(), sales.id, "admin", UserRole::Manager)
            .await
            .unwrap();
        assert_eq!(promoted.role, UserRole::Manager);

        let owner_grant = update_user_role(conn.clone(), sales.id, "owner", UserRole::Owner)
            .await
            .unwrap();
        assert_eq!(owner_grant.role, UserRole::Owner);

        let err = update_user_role(conn.clone(), sales.id, "stranger", UserRole::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::PermissionDenied(_)));

        let err = update_user_role(conn.clone(), 999, "owner", UserRole::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound(_)));
    }
}
