//! Property-based tests for the isolation guard.

use proptest::prelude::*;
use uuid::Uuid;

use coatbook_shared::types::{TenantId, UserId};

use crate::tenancy::guard::{Access, DenialReason, authorize};
use crate::tenancy::role::{ActingContext, Permission, Role};

fn arb_tenant() -> impl Strategy<Value = TenantId> {
    (1u128..u128::MAX).prop_map(|n| TenantId::from_uuid(Uuid::from_u128(n)))
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Viewer),
        Just(Role::Operator),
        Just(Role::Accountant),
        Just(Role::Admin),
        Just(Role::Owner),
    ]
}

fn arb_permission() -> impl Strategy<Value = Permission> {
    prop_oneof![
        Just(Permission::EditDraft),
        Just(Permission::IssueInvoice),
        Just(Permission::IssueCreditNote),
        Just(Permission::RecordPayment),
        Just(Permission::ExportLedger),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Allowed exactly when both ids are present and equal.
    #[test]
    fn prop_allowed_iff_equal(a in arb_tenant(), b in arb_tenant()) {
        let access = authorize(a, b);
        if a == b {
            prop_assert_eq!(access, Access::Allowed);
        } else {
            prop_assert_eq!(access, Access::Denied(DenialReason::CrossTenantAccess));
        }
    }

    /// A resource is always accessible to its own tenant.
    #[test]
    fn prop_reflexive(a in arb_tenant()) {
        prop_assert!(authorize(a, a).is_allowed());
    }

    /// No role overrides a cross-tenant denial.
    #[test]
    fn prop_role_never_bypasses_tenant(
        a in arb_tenant(),
        b in arb_tenant(),
        role in arb_role(),
        permission in arb_permission(),
    ) {
        prop_assume!(a != b);
        let ctx = ActingContext::new(b, UserId::new(), role);
        prop_assert!(ctx.ensure(a, permission).is_err());
    }

    /// Role permissions are monotone in privilege.
    #[test]
    fn prop_higher_role_keeps_permissions(
        low in arb_role(),
        high in arb_role(),
        permission in arb_permission(),
    ) {
        prop_assume!(low <= high);
        if low.allows(permission) {
            prop_assert!(high.allows(permission));
        }
    }
}
