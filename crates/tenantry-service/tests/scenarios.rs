//! End-to-end tenancy scenarios.

mod common;

use common::{Fixture, PASSWORD};
use tenantry_auth::{AdminCreateUserRequest, TenancyError};
use tenantry_org::Role;
use tenantry_service::CreateOrganizationRequest;

#[tokio::test]
async fn test_tenant_org_admins_and_capacity() {
    let fx = Fixture::new().await;

    let acme = fx.tenant("Acme").await;
    let risk = fx.org(Some(acme.id), "Acme-Risk", 2).await;
    assert_eq!(risk.slug, "acme-risk");
    assert_eq!(risk.tenant_id, Some(acme.id));

    let tenant_admin = fx
        .provision(&fx.root, "ta@acme.com", Role::TenantAdmin, None, Some(acme.id))
        .await;
    assert_eq!(tenant_admin.tenant_id, Some(acme.id));

    let org_admin = fx
        .provision(&tenant_admin, "oa@acme.com", Role::OrgAdmin, Some(risk.id), None)
        .await;
    assert_eq!(org_admin.organization_id, Some(risk.id));
    assert_eq!(org_admin.tenant_id, Some(acme.id));

    let mut joiners = Vec::new();
    for email in ["one@acme.com", "two@acme.com", "three@acme.com"] {
        fx.services
            .add_to_whitelist(&org_admin, risk.id, email)
            .await
            .unwrap();
        joiners.push(fx.register(email).await);
    }

    for joiner in &joiners[..2] {
        let outcome = fx
            .services
            .join_organization(joiner, &risk.join_token)
            .await
            .unwrap();
        assert_eq!(outcome.user.role, Role::OrgMember);
        assert_eq!(outcome.user.organization_id, Some(risk.id));
        assert_eq!(outcome.user.tenant_id, Some(acme.id));
    }

    let err = fx
        .services
        .join_organization(&joiners[2], &risk.join_token)
        .await
        .unwrap_err();
    assert!(matches!(&err, TenancyError::Conflict(msg) if msg.contains("capacity")));

    let third = fx.user(joiners[2].user_id).await.unwrap();
    assert_eq!(third.organization_id, None);
    assert_eq!(third.role, Role::User);
}

#[tokio::test]
async fn test_self_registration_rejects_role_field() {
    let fx = Fixture::new().await;

    let smuggled = format!(
        r#"{{"email":"eve@evil.io","password":"{PASSWORD}","role":"super_admin"}}"#
    );
    let err = fx.services.self_register_json(&smuggled).await.unwrap_err();
    assert!(matches!(err, TenancyError::Validation(_)));
    assert!(fx.services.authenticate("eve@evil.io", PASSWORD).await.is_err());

    let plain = format!(r#"{{"email":"eve@evil.io","password":"{PASSWORD}"}}"#);
    let user = fx.services.self_register_json(&plain).await.unwrap();
    assert_eq!(user.role, Role::User);
    assert_eq!(user.organization_id, None);
    assert_eq!(user.tenant_id, None);
    assert!(user.is_active);
}

#[tokio::test]
async fn test_tenant_admin_cannot_create_organization_in_other_tenant() {
    let fx = Fixture::new().await;
    let x = fx.tenant("Tenant X").await;
    let y = fx.tenant("Tenant Y").await;
    let admin_x = fx
        .provision(&fx.root, "admin@x.io", Role::TenantAdmin, None, Some(x.id))
        .await;

    let err = fx
        .services
        .create_organization(&admin_x, CreateOrganizationRequest::new("Intruder").in_tenant(y.id))
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Forbidden { .. }));

    let own = fx
        .services
        .create_organization(&admin_x, CreateOrganizationRequest::new("Home"))
        .await
        .unwrap();
    assert_eq!(own.tenant_id, Some(x.id));
    assert_eq!(fx.services.list_organizations(&admin_x).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_force_delete_detaches_all_members() {
    let fx = Fixture::new().await;
    let org = fx.org(None, "Busy", 10).await;

    let mut member_ids = Vec::new();
    for i in 0..5 {
        let email = format!("m{i}@busy.io");
        member_ids.push(fx.member_of(&org, &email).await.user_id);
    }

    let err = fx
        .services
        .delete_organization(&fx.root, org.id, false)
        .await
        .unwrap_err();
    assert!(matches!(&err, TenancyError::Conflict(msg) if msg.contains('5')));
    assert!(fx.organization(org.id).await.is_some());

    let deletion = fx
        .services
        .delete_organization(&fx.root, org.id, true)
        .await
        .unwrap();
    assert_eq!(deletion.detached_members.len(), 5);
    assert_eq!(deletion.removed_whitelist_entries, 5);

    assert!(fx.organization(org.id).await.is_none());
    assert!(fx.users_in(org.id).await.is_empty());
    for id in member_ids {
        let user = fx.user(id).await.expect("member row survives");
        assert_eq!(user.organization_id, None);
        assert_eq!(user.role, Role::User);
        assert!(user.role_is_consistent());
    }
}

#[tokio::test]
async fn test_previous_join_token_stops_resolving() {
    let fx = Fixture::new().await;
    let org = fx.org(None, "Rotating", 10).await;
    let old_token = org.join_token.clone();

    let joiner = fx.register("late@rotating.io").await;
    fx.services
        .add_to_whitelist(&fx.root, org.id, "late@rotating.io")
        .await
        .unwrap();

    let rotated = fx
        .services
        .regenerate_join_token(&fx.root, org.id)
        .await
        .unwrap();
    assert_ne!(rotated.join_token, old_token);
    assert!(rotated.join_created_at >= org.join_created_at);

    let err = fx
        .services
        .join_organization(&joiner, &old_token)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::NotFound(_)));

    fx.services
        .join_organization(&joiner, &rotated.join_token)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_org_admin_provisions_only_into_own_organization() {
    let fx = Fixture::new().await;
    let home = fx.org(None, "Home", 10).await;
    let away = fx.org(None, "Away", 10).await;
    let admin = fx
        .provision(&fx.root, "oa@home.io", Role::OrgAdmin, Some(home.id), None)
        .await;

    let err = fx
        .services
        .admin_create_user(
            &admin,
            AdminCreateUserRequest::new("x@away.io", PASSWORD).with_organization(away.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Forbidden { .. }));

    let created = fx
        .services
        .admin_create_user(&admin, AdminCreateUserRequest::new("x@home.io", PASSWORD))
        .await
        .unwrap();
    assert_eq!(created.organization_id, Some(home.id));
    assert_eq!(created.role, Role::OrgMember);
}
