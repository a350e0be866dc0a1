//! Tenant and organization lifecycle.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{drain, faulty_fixture, BrokenBus, Fixture};
use tenantry_auth::TenancyError;
use tenantry_org::{OrganizationPatch, Role, TenantPatch};
use tenantry_service::{CreateOrganizationRequest, CreateTenantRequest};

#[tokio::test]
async fn test_tenant_crud() {
    let fx = Fixture::new().await;
    let mut events = fx.subscribe_all().await;

    let tenant = fx
        .services
        .create_tenant(
            &fx.root,
            CreateTenantRequest::new("  Acme Holdings ")
                .with_domain("Acme.COM")
                .with_description("parent company"),
        )
        .await
        .unwrap();
    assert_eq!(tenant.name, "Acme Holdings");
    assert_eq!(tenant.slug, "acme-holdings");
    assert_eq!(tenant.domain.as_deref(), Some("acme.com"));
    assert!(tenant.is_active);

    let updated = fx
        .services
        .update_tenant(
            &fx.root,
            tenant.id,
            TenantPatch {
                name: Some("Acme Group".to_string()),
                ..TenantPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Acme Group");
    assert_eq!(updated.slug, "acme-holdings");

    let fetched = fx.services.get_tenant(&fx.root, tenant.id).await.unwrap();
    assert_eq!(fetched.name, "Acme Group");

    let deletion = fx
        .services
        .delete_tenant(&fx.root, tenant.id, false)
        .await
        .unwrap();
    assert!(deletion.deleted_organizations.is_empty());
    assert!(fx.services.list_tenants(&fx.root).await.unwrap().is_empty());

    assert_eq!(
        drain(&mut events),
        vec!["tenant.created", "tenant.updated", "tenant.deleted"]
    );
}

#[tokio::test]
async fn test_tenant_requires_name_and_valid_domain() {
    let fx = Fixture::new().await;

    let err = fx
        .services
        .create_tenant(&fx.root, CreateTenantRequest::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Validation(_)));

    let err = fx
        .services
        .create_tenant(&fx.root, CreateTenantRequest::new("Acme").with_domain("not a domain"))
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Validation(_)));
}

#[tokio::test]
async fn test_only_super_admin_creates_tenants() {
    let fx = Fixture::new().await;
    let tenant = fx.tenant("Acme").await;
    let admin = fx
        .provision(&fx.root, "ta@acme.com", Role::TenantAdmin, None, Some(tenant.id))
        .await;

    let err = fx
        .services
        .create_tenant(&admin, CreateTenantRequest::new("Rogue"))
        .await
        .unwrap_err();
    assert_eq!(err, TenancyError::forbidden("requires super_admin"));
}

#[tokio::test]
async fn test_duplicate_names_get_suffixed_slugs() {
    let fx = Fixture::new().await;
    let first = fx.tenant("Acme").await;
    let second = fx.tenant("Acme").await;

    assert_eq!(first.slug, "acme");
    assert_ne!(second.slug, first.slug);
    assert!(second.slug.starts_with("acme-"));

    let org_a = fx.org(None, "Risk", 5).await;
    let org_b = fx.org(None, "Risk", 5).await;
    assert_eq!(org_a.slug, "risk");
    assert!(org_b.slug.starts_with("risk-"));
}

#[tokio::test]
async fn test_domains_are_unique_across_tenants_and_organizations() {
    let fx = Fixture::new().await;
    let tenant = fx
        .services
        .create_tenant(&fx.root, CreateTenantRequest::new("Acme").with_domain("acme.com"))
        .await
        .unwrap();

    let err = fx
        .services
        .create_organization(
            &fx.root,
            CreateOrganizationRequest::new("Copycat").with_domain("ACME.com"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Conflict(msg) if msg.contains("acme.com")));

    let err = fx
        .services
        .create_tenant(&fx.root, CreateTenantRequest::new("Other").with_domain("acme.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Conflict(_)));

    // Keeping one's own domain is not a conflict.
    fx.services
        .update_tenant(
            &fx.root,
            tenant.id,
            TenantPatch {
                domain: Some("acme.com".to_string()),
                ..TenantPatch::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_tenant_admin_cannot_toggle_tenant_activation() {
    let fx = Fixture::new().await;
    let tenant = fx.tenant("Acme").await;
    let admin = fx
        .provision(&fx.root, "ta@acme.com", Role::TenantAdmin, None, Some(tenant.id))
        .await;

    let err = fx
        .services
        .update_tenant(
            &admin,
            tenant.id,
            TenantPatch {
                is_active: Some(false),
                ..TenantPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Forbidden { .. }));

    let renamed = fx
        .services
        .update_tenant(
            &admin,
            tenant.id,
            TenantPatch {
                description: Some("ours".to_string()),
                ..TenantPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.description.as_deref(), Some("ours"));
}

#[tokio::test]
async fn test_inactive_tenant_rejects_new_organizations() {
    let fx = Fixture::new().await;
    let tenant = fx.tenant("Frozen").await;
    fx.services
        .update_tenant(
            &fx.root,
            tenant.id,
            TenantPatch {
                is_active: Some(false),
                ..TenantPatch::default()
            },
        )
        .await
        .unwrap();

    let err = fx
        .services
        .create_organization(&fx.root, CreateOrganizationRequest::new("Late").in_tenant(tenant.id))
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Conflict(_)));
}

#[tokio::test]
async fn test_tenant_delete_without_force_conflicts() {
    let fx = Fixture::new().await;
    let tenant = fx.tenant("Acme").await;
    fx.org(Some(tenant.id), "Risk", 5).await;

    let err = fx
        .services
        .delete_tenant(&fx.root, tenant.id, false)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Conflict(msg) if msg.contains("1 organizations")));
    assert_eq!(fx.services.list_tenants(&fx.root).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_tenant_force_delete_leaves_no_dangling_references() {
    let fx = Fixture::new().await;
    let tenant = fx.tenant("Acme").await;
    let risk = fx.org(Some(tenant.id), "Risk", 5).await;
    let ops = fx.org(Some(tenant.id), "Ops", 5).await;

    let tenant_admin = fx
        .provision(&fx.root, "ta@acme.com", Role::TenantAdmin, None, Some(tenant.id))
        .await;
    let org_admin = fx
        .provision(&fx.root, "oa@acme.com", Role::OrgAdmin, Some(risk.id), None)
        .await;
    let member = fx.member_of(&ops, "m@acme.com").await;

    let deletion = fx
        .services
        .delete_tenant(&fx.root, tenant.id, true)
        .await
        .unwrap();
    assert_eq!(deletion.deleted_organizations.len(), 2);
    assert_eq!(deletion.detached_users, 3);

    assert!(fx.organization(risk.id).await.is_none());
    assert!(fx.organization(ops.id).await.is_none());
    assert!(fx.whitelist_of(ops.id).await.is_empty());

    for id in [tenant_admin.user_id, org_admin.user_id, member.user_id] {
        let user = fx.user(id).await.unwrap();
        assert_eq!(user.tenant_id, None);
        assert_eq!(user.organization_id, None);
        assert_eq!(user.role, Role::User);
    }

    let err = fx.services.get_tenant(&fx.root, tenant.id).await.unwrap_err();
    assert!(matches!(err, TenancyError::NotFound(_)));
}

#[tokio::test]
async fn test_org_admin_cannot_patch_tenant_level_fields() {
    let fx = Fixture::new().await;
    let tenant = fx.tenant("Acme").await;
    let org = fx.org(Some(tenant.id), "Risk", 5).await;
    let admin = fx
        .provision(&fx.root, "oa@acme.com", Role::OrgAdmin, Some(org.id), None)
        .await;

    let err = fx
        .services
        .update_organization(
            &admin,
            org.id,
            OrganizationPatch {
                is_active: Some(false),
                allow_global_data_access: Some(true),
                ..OrganizationPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        TenancyError::forbidden("is_active, allow_global_data_access requires tenant_admin or above")
    );
    assert!(fx.organization(org.id).await.unwrap().is_active);

    let updated = fx
        .services
        .update_organization(
            &admin,
            org.id,
            OrganizationPatch {
                name: Some("Risk Desk".to_string()),
                max_users: Some(20),
                ..OrganizationPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Risk Desk");
    assert_eq!(updated.slug, "risk");
    assert_eq!(updated.max_users, 20);
}

#[tokio::test]
async fn test_organization_patch_validation() {
    let fx = Fixture::new().await;
    let org = fx.org(None, "Risk", 5).await;

    let zero = OrganizationPatch {
        max_users: Some(0),
        ..OrganizationPatch::default()
    };
    let err = fx
        .services
        .update_organization(&fx.root, org.id, zero)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Validation(_)));

    let bad_role = OrganizationPatch {
        default_role: Some(Role::TenantAdmin),
        ..OrganizationPatch::default()
    };
    let err = fx
        .services
        .update_organization(&fx.root, org.id, bad_role)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Validation(_)));
}

#[tokio::test]
async fn test_moving_an_organization_moves_its_members() {
    let fx = Fixture::new().await;
    let old = fx.tenant("Old").await;
    let new = fx.tenant("New").await;
    let org = fx.org(Some(old.id), "Nomads", 5).await;
    let member = fx.member_of(&org, "n@nomads.io").await;
    assert_eq!(member.tenant_id, Some(old.id));

    let moved = fx
        .services
        .update_organization(
            &fx.root,
            org.id,
            OrganizationPatch {
                tenant_id: Some(new.id),
                ..OrganizationPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.tenant_id, Some(new.id));
    assert_eq!(fx.user(member.user_id).await.unwrap().tenant_id, Some(new.id));

    // A tenant admin may not move an organization out of reach.
    let admin = fx
        .provision(&fx.root, "ta@new.io", Role::TenantAdmin, None, Some(new.id))
        .await;
    let err = fx
        .services
        .update_organization(
            &admin,
            org.id,
            OrganizationPatch {
                tenant_id: Some(old.id),
                ..OrganizationPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Forbidden { .. }));
}

#[tokio::test]
async fn test_out_of_scope_reads_are_not_found() {
    let fx = Fixture::new().await;
    let x = fx.tenant("X").await;
    let y = fx.tenant("Y").await;
    let org_y = fx.org(Some(y.id), "Y Org", 5).await;
    let admin_x = fx
        .provision(&fx.root, "ta@x.io", Role::TenantAdmin, None, Some(x.id))
        .await;

    let err = fx
        .services
        .get_organization(&admin_x, org_y.id)
        .await
        .unwrap_err();
    assert_eq!(err, TenancyError::NotFound("organization not found".to_string()));

    let err = fx.services.get_tenant(&admin_x, y.id).await.unwrap_err();
    assert_eq!(err, TenancyError::NotFound("tenant not found".to_string()));

    let err = fx
        .services
        .list_members(&admin_x, org_y.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::NotFound(_)));

    // Mutations on the same target are refused outright.
    let err = fx
        .services
        .regenerate_join_token(&admin_x, org_y.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Forbidden { .. }));

    let listed = fx.services.list_tenants(&admin_x).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, x.id);
}

#[tokio::test]
async fn test_members_read_their_own_organization() {
    let fx = Fixture::new().await;
    let org = fx.org(None, "Readers", 5).await;
    let other = fx.org(None, "Others", 5).await;
    let member = fx.member_of(&org, "r@readers.io").await;

    let fetched = fx.services.get_organization(&member, org.id).await.unwrap();
    assert_eq!(fetched.id, org.id);
    let members = fx.services.list_members(&member, org.id).await.unwrap();
    assert_eq!(members.len(), 1);

    let err = fx
        .services
        .get_organization(&member, other.id)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::NotFound(_)));

    // A plain user fails the role guard before any scope check.
    let loner = fx.register("loner@nowhere.io").await;
    let err = fx.services.get_organization(&loner, org.id).await.unwrap_err();
    assert!(matches!(err, TenancyError::Forbidden { .. }));
}

#[tokio::test]
async fn test_remove_member_respects_rank() {
    let fx = Fixture::new().await;
    let tenant = fx.tenant("Acme").await;
    let org = fx.org(Some(tenant.id), "Risk", 10).await;
    let admin_a = fx
        .provision(&fx.root, "a@acme.com", Role::OrgAdmin, Some(org.id), None)
        .await;
    let admin_b = fx
        .provision(&fx.root, "b@acme.com", Role::OrgAdmin, Some(org.id), None)
        .await;
    let member = fx.member_of(&org, "m@acme.com").await;

    let err = fx
        .services
        .remove_member(&admin_a, org.id, admin_b.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::Forbidden { .. }));

    let removed = fx
        .services
        .remove_member(&admin_a, org.id, member.user_id)
        .await
        .unwrap();
    assert_eq!(removed.role, Role::User);

    let tenant_admin = fx
        .provision(&fx.root, "ta@acme.com", Role::TenantAdmin, None, Some(tenant.id))
        .await;
    fx.services
        .remove_member(&tenant_admin, org.id, admin_b.user_id)
        .await
        .unwrap();

    let err = fx
        .services
        .remove_member(&fx.root, org.id, member.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::NotFound(_)));
}

#[tokio::test]
async fn test_slug_race_is_retried() {
    let (fx, faults) = faulty_fixture().await;
    faults.organization_slug_race.store(true, Ordering::SeqCst);

    let org = fx.org(None, "Racy", 5).await;
    assert!(org.slug.starts_with("racy-"));
    assert!(fx.organization(org.id).await.is_some());
}

#[tokio::test]
async fn test_commit_failure_leaves_store_unchanged() {
    let (fx, faults) = faulty_fixture().await;
    let mut events = fx.subscribe_all().await;
    faults.commit_failure.store(true, Ordering::SeqCst);

    let err = fx
        .services
        .create_tenant(&fx.root, CreateTenantRequest::new("Doomed"))
        .await
        .unwrap_err();
    assert_eq!(err, TenancyError::Internal("storage failure".to_string()));

    assert!(fx.services.list_tenants(&fx.root).await.unwrap().is_empty());
    assert!(drain(&mut events).is_empty());
}

#[tokio::test]
async fn test_publish_failure_does_not_roll_back() {
    let fx = Fixture::new().await;
    let services = fx.services.clone().with_event_bus(Arc::new(BrokenBus));

    let tenant = services
        .create_tenant(&fx.root, CreateTenantRequest::new("Quiet"))
        .await
        .unwrap();
    let org = services
        .create_organization(&fx.root, CreateOrganizationRequest::new("Silent").in_tenant(tenant.id))
        .await
        .unwrap();

    assert!(fx.organization(org.id).await.is_some());
    assert_eq!(fx.services.list_tenants(&fx.root).await.unwrap().len(), 1);
}
