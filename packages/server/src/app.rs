//! Application assembly: stores, guards, modules, and the dispatcher.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use campus_core::{now_millis, GuardName, Role, User, UserId};

use crate::auth::{hash_password, RevocationStore, TokenService};
use crate::config::ServerConfig;
use crate::dispatch::{Dispatcher, GuardRegistry, ModuleRegistry};
use crate::guards::{AuthGuard, RoleGuard, SchemaGuard, TransferAccessGuard, TransferValidationGuard};
use crate::modules::{ClassroomsModule, SchoolsModule, StudentsModule, UsersModule};
use crate::storage::{
    ClassroomStore, MemoryClassroomStore, MemorySchoolStore, MemoryStudentStore,
    MemoryTransferStore, MemoryUserStore, SchoolStore, StudentStore, TransferStore, UserStore,
};

/// The five stores every assembly needs, behind trait objects so tests and
/// future backends can swap any of them.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub schools: Arc<dyn SchoolStore>,
    pub classrooms: Arc<dyn ClassroomStore>,
    pub students: Arc<dyn StudentStore>,
    pub transfers: Arc<dyn TransferStore>,
}

impl Stores {
    /// Fresh in-memory stores, the default backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(MemoryUserStore::new()),
            schools: Arc::new(MemorySchoolStore::new()),
            classrooms: Arc::new(MemoryClassroomStore::new()),
            students: Arc::new(MemoryStudentStore::new()),
            transfers: Arc::new(MemoryTransferStore::new()),
        }
    }
}

/// Assembled application: the dispatcher plus the shared pieces that need
/// maintenance after startup.
pub struct App {
    pub dispatcher: Dispatcher,
    /// Same store the auth guard and users module share; the binary purges
    /// expired entries from it periodically.
    pub revocations: Arc<RevocationStore>,
}

/// Wire every guard and module and build the validated dispatcher.
///
/// # Errors
///
/// Any route-table inconsistency between contracts, implementations, and
/// registered guards.
pub fn build_app(config: &ServerConfig, stores: &Stores) -> anyhow::Result<App> {
    let tokens = Arc::new(TokenService::new(&config.jwt_secret, config.token_ttl));
    let revocations = Arc::new(RevocationStore::new());

    let mut guards = GuardRegistry::new();
    guards.register(
        GuardName::Auth,
        Arc::new(AuthGuard::new(
            tokens.clone(),
            stores.users.clone(),
            revocations.clone(),
        )),
    );
    guards.register(
        GuardName::RequireSuperadmin,
        Arc::new(RoleGuard::superadmin_only()),
    );
    guards.register(
        GuardName::RequireSchoolAdmin,
        Arc::new(RoleGuard::school_admin()),
    );
    guards.register(
        GuardName::TransferAccess,
        Arc::new(TransferAccessGuard::new(stores.students.clone())),
    );
    guards.register(GuardName::ValidateLogin, Arc::new(SchemaGuard::login()));
    guards.register(
        GuardName::ValidateCreateUser,
        Arc::new(SchemaGuard::create_user()),
    );
    guards.register(
        GuardName::ValidateUpdateUser,
        Arc::new(SchemaGuard::update_user()),
    );
    guards.register(
        GuardName::ValidateCreateSchool,
        Arc::new(SchemaGuard::create_school()),
    );
    guards.register(
        GuardName::ValidateUpdateSchool,
        Arc::new(SchemaGuard::update_school()),
    );
    guards.register(
        GuardName::ValidateCreateClassroom,
        Arc::new(SchemaGuard::create_classroom()),
    );
    guards.register(
        GuardName::ValidateUpdateClassroom,
        Arc::new(SchemaGuard::update_classroom()),
    );
    guards.register(
        GuardName::ValidateCreateStudent,
        Arc::new(SchemaGuard::create_student()),
    );
    guards.register(
        GuardName::ValidateUpdateStudent,
        Arc::new(SchemaGuard::update_student()),
    );
    guards.register(
        GuardName::ValidateTransferStudent,
        Arc::new(TransferValidationGuard::new()),
    );

    let mut modules = ModuleRegistry::new();
    modules.register(Arc::new(UsersModule::new(
        stores.users.clone(),
        tokens,
        revocations.clone(),
    )));
    modules.register(Arc::new(SchoolsModule::new(stores.schools.clone())));
    modules.register(Arc::new(ClassroomsModule::new(
        stores.classrooms.clone(),
        stores.schools.clone(),
    )));
    modules.register(Arc::new(StudentsModule::new(
        stores.students.clone(),
        stores.schools.clone(),
        stores.classrooms.clone(),
        stores.transfers.clone(),
    )));

    let dispatcher = Dispatcher::new(modules, guards).context("failed to assemble dispatcher")?;
    Ok(App {
        dispatcher,
        revocations,
    })
}

/// Build only the dispatcher. Tests that never purge use this.
///
/// # Errors
///
/// See [`build_app`].
pub fn build_dispatcher(config: &ServerConfig, stores: &Stores) -> anyhow::Result<Dispatcher> {
    Ok(build_app(config, stores)?.dispatcher)
}

/// Ensure a superadmin account exists so a fresh deployment can log in.
///
/// Idempotent: an existing account with the email is left untouched.
///
/// # Errors
///
/// Store failures while looking up or inserting the account.
pub async fn seed_superadmin(
    stores: &Stores,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if stores
        .users
        .find_by_email(email)
        .await
        .context("superadmin lookup failed")?
        .is_some()
    {
        return Ok(());
    }
    stores
        .users
        .insert(User {
            id: UserId::generate(),
            email: email.to_string(),
            password_hash: hash_password(password),
            role: Role::Superadmin,
            school_id: None,
            is_active: true,
            created_at: now_millis(),
        })
        .await
        .context("superadmin insert failed")?;
    info!(email, "seeded superadmin account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use campus_core::HttpVerb;

    use super::*;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    async fn stack() -> (Dispatcher, Stores) {
        let stores = Stores::in_memory();
        seed_superadmin(&stores, "root@example.com", "root-password")
            .await
            .unwrap();
        let dispatcher = build_dispatcher(&ServerConfig::default(), &stores).unwrap();
        (dispatcher, stores)
    }

    async fn login(dispatcher: &Dispatcher, email: &str, password: &str) -> String {
        let envelope = dispatcher
            .handle(
                "users",
                "login",
                HttpVerb::Post,
                obj(json!({"email": email, "password": password})),
                Map::new(),
                None,
            )
            .await;
        assert!(envelope.success, "login failed: {}", envelope.message);
        envelope.data.unwrap()["token"].as_str().unwrap().to_string()
    }

    /// One call through the full stack, returning the envelope.
    async fn call(
        dispatcher: &Dispatcher,
        token: &str,
        module: &str,
        operation: &str,
        verb: HttpVerb,
        payload: Value,
    ) -> campus_core::Envelope {
        dispatcher
            .handle(
                module,
                operation,
                verb,
                obj(payload),
                Map::new(),
                Some(token.to_string()),
            )
            .await
    }

    #[tokio::test]
    async fn dispatcher_assembles_against_all_contracts() {
        let (dispatcher, _) = stack().await;
        // users(7) + schools(5) + classrooms(5) + students(7)
        assert_eq!(dispatcher.routes().len(), 24);
    }

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let stores = Stores::in_memory();
        seed_superadmin(&stores, "root@example.com", "pw-one").await.unwrap();
        seed_superadmin(&stores, "root@example.com", "pw-two").await.unwrap();
        let user = stores
            .users
            .find_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(crate::auth::verify_password("pw-one", &user.password_hash));
    }

    #[tokio::test]
    async fn revocations_handle_reaches_the_auth_guard() {
        let stores = Stores::in_memory();
        seed_superadmin(&stores, "root@example.com", "root-password")
            .await
            .unwrap();
        let app = build_app(&ServerConfig::default(), &stores).unwrap();
        let token = login(&app.dispatcher, "root@example.com", "root-password").await;

        // Revoking through the exposed handle, not the logout operation,
        // must still lock the token out.
        app.revocations.revoke(&token, now_millis() + 60_000);
        let denied =
            call(&app.dispatcher, &token, "users", "list", HttpVerb::Get, json!({})).await;
        assert_eq!(denied.code, 401);
        assert_eq!(denied.message, "invalid token");
    }

    #[tokio::test]
    async fn logged_out_token_no_longer_works() {
        let (dispatcher, _) = stack().await;
        let token = login(&dispatcher, "root@example.com", "root-password").await;

        let out = call(&dispatcher, &token, "users", "logout", HttpVerb::Post, json!({})).await;
        assert!(out.success);

        let denied =
            call(&dispatcher, &token, "users", "list", HttpVerb::Get, json!({})).await;
        assert_eq!(denied.code, 401);
        assert_eq!(denied.message, "invalid token");
    }

    /// End-to-end walk: the superadmin builds out two schools, enrolls a
    /// student, transfers them across schools, then the destination school's
    /// admin transfers them within their own school. History shows both
    /// moves in order.
    #[tokio::test]
    async fn cross_school_then_local_transfer_builds_ordered_history() {
        let (dispatcher, _) = stack().await;
        let root = login(&dispatcher, "root@example.com", "root-password").await;

        let mut school_ids = Vec::new();
        let mut classroom_ids = Vec::new();
        for name in ["Alpha Academy", "Beta College"] {
            let school = call(
                &dispatcher,
                &root,
                "schools",
                "create",
                HttpVerb::Post,
                json!({
                    "name": name,
                    "address": "1 Main St",
                    "contact_email": "office@example.com",
                    "phone": "555-0101",
                }),
            )
            .await;
            assert_eq!(school.code, 201, "{}", school.message);
            let school_id = school.data.unwrap()["id"].as_str().unwrap().to_string();
            let classroom = call(
                &dispatcher,
                &root,
                "classrooms",
                "create",
                HttpVerb::Post,
                json!({"name": "Year 1", "code": "Y1", "school_id": school_id}),
            )
            .await;
            assert_eq!(classroom.code, 201, "{}", classroom.message);
            classroom_ids.push(classroom.data.unwrap()["id"].as_str().unwrap().to_string());
            school_ids.push(school_id);
        }
        // Second classroom inside Beta College for the local move.
        let beta_room_2 = call(
            &dispatcher,
            &root,
            "classrooms",
            "create",
            HttpVerb::Post,
            json!({"name": "Year 2", "code": "Y2", "school_id": school_ids[1]}),
        )
        .await;
        let beta_room_2 = beta_room_2.data.unwrap()["id"].as_str().unwrap().to_string();

        let student = call(
            &dispatcher,
            &root,
            "students",
            "create",
            HttpVerb::Post,
            json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@example.com",
                "school_id": school_ids[0],
                "classroom_id": classroom_ids[0],
            }),
        )
        .await;
        assert_eq!(student.code, 201, "{}", student.message);
        let student_id = student.data.unwrap()["id"].as_str().unwrap().to_string();

        let beta_admin = call(
            &dispatcher,
            &root,
            "users",
            "create",
            HttpVerb::Post,
            json!({
                "email": "beta.admin@example.com",
                "password": "beta-password",
                "role": "school_admin",
                "school_id": school_ids[1],
            }),
        )
        .await;
        assert_eq!(beta_admin.code, 201, "{}", beta_admin.message);

        // Superadmin moves the student Alpha -> Beta.
        let first_move = call(
            &dispatcher,
            &root,
            "students",
            "transfer",
            HttpVerb::Post,
            json!({
                "student_id": student_id,
                "to_school_id": school_ids[1],
                "to_classroom_id": classroom_ids[1],
                "reason": "relocation",
            }),
        )
        .await;
        assert!(first_move.success, "{}", first_move.message);

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        // Beta's admin moves the student within Beta.
        let beta_token = login(&dispatcher, "beta.admin@example.com", "beta-password").await;
        let second_move = call(
            &dispatcher,
            &beta_token,
            "students",
            "transfer",
            HttpVerb::Post,
            json!({
                "student_id": student_id,
                "to_school_id": school_ids[1],
                "to_classroom_id": beta_room_2,
            }),
        )
        .await;
        assert!(second_move.success, "{}", second_move.message);

        let history = call(
            &dispatcher,
            &beta_token,
            "students",
            "history",
            HttpVerb::Get,
            json!({"student_id": student_id}),
        )
        .await;
        assert!(history.success, "{}", history.message);
        let records = history.data.unwrap();
        let records = records.as_array().unwrap().clone();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["from_school_id"], school_ids[0].as_str());
        assert_eq!(records[0]["to_school_id"], school_ids[1].as_str());
        assert_eq!(records[1]["to_classroom_id"], beta_room_2.as_str());
    }

    #[tokio::test]
    async fn school_admin_cannot_touch_platform_operations() {
        let (dispatcher, stores) = stack().await;
        let root = login(&dispatcher, "root@example.com", "root-password").await;
        let school = call(
            &dispatcher,
            &root,
            "schools",
            "create",
            HttpVerb::Post,
            json!({
                "name": "Alpha Academy",
                "address": "1 Main St",
                "contact_email": "office@example.com",
                "phone": "555-0101",
            }),
        )
        .await;
        let school_id = school.data.unwrap()["id"].as_str().unwrap().to_string();
        call(
            &dispatcher,
            &root,
            "users",
            "create",
            HttpVerb::Post,
            json!({
                "email": "admin@example.com",
                "password": "admin-password",
                "role": "school_admin",
                "school_id": school_id,
            }),
        )
        .await;
        drop(stores);

        let admin = login(&dispatcher, "admin@example.com", "admin-password").await;
        let denied = call(
            &dispatcher,
            &admin,
            "schools",
            "create",
            HttpVerb::Post,
            json!({
                "name": "Rogue School",
                "address": "2 Side St",
                "contact_email": "rogue@example.com",
                "phone": "555-0102",
            }),
        )
        .await;
        assert_eq!(denied.code, 403);
        assert_eq!(denied.message, "access denied");
    }
}
