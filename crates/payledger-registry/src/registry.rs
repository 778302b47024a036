//! Role, whitelist, fee, and pause management.
//!
//! Role checks are additive: holding one role never implies another. The
//! one exception is `Administrator`, which implicitly satisfies the
//! checks guarding role management itself, and counts as "or above" for
//! fee writes. Whitelist management strictly requires its own role.

use payledger_store::LedgerStore;
use payledger_types::{
    AccountId, AuditKind, AuditRecord, LedgerError, Result, Role,
};

/// The Authorization & Whitelist Registry.
///
/// Stateless apart from its module identity: all durable registry state
/// (role grants, whitelists, fee config, pause flag) lives in the
/// [`LedgerStore`], which this module mutates under its registered
/// identity after performing the role checks the store itself does not.
pub struct AccessRegistry {
    module_id: AccountId,
}

impl AccessRegistry {
    #[must_use]
    pub fn new(module_id: AccountId) -> Self {
        Self { module_id }
    }

    /// The identity this module mutates the store under.
    #[must_use]
    pub fn module_id(&self) -> AccountId {
        self.module_id
    }

    // =====================================================================
    // Role checks
    // =====================================================================

    /// Require `caller` to hold exactly `role`.
    pub fn require_role(store: &LedgerStore, caller: AccountId, role: Role) -> Result<()> {
        if store.has_role(caller, role) {
            return Ok(());
        }
        Err(LedgerError::NotAuthorized {
            reason: format!("{caller} lacks {role}"),
        })
    }

    /// Require `caller` to hold `role` or `Administrator` ("or above").
    pub fn require_role_or_admin(
        store: &LedgerStore,
        caller: AccountId,
        role: Role,
    ) -> Result<()> {
        if store.has_role(caller, role) || store.has_role(caller, Role::Administrator) {
            return Ok(());
        }
        Err(LedgerError::NotAuthorized {
            reason: format!("{caller} lacks {role}"),
        })
    }

    /// Whether `asset` is accepted for `merchant`: listed globally AND on
    /// the merchant's own whitelist.
    #[must_use]
    pub fn is_asset_accepted(store: &LedgerStore, merchant: AccountId, asset: &str) -> bool {
        store.is_asset_listed(asset) && store.is_merchant_asset_listed(merchant, asset)
    }

    // =====================================================================
    // Role management (Administrator only)
    // =====================================================================

    pub fn grant_role(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
        role: Role,
    ) -> Result<()> {
        Self::require_role(store, caller, Role::Administrator)?;
        store.set_role(self.module_id, account, role)?;
        tracing::info!(actor = %caller, account = %account, role = %role, "role granted");
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::RoleGranted, account.to_string(), caller, None, None),
        )
    }

    pub fn revoke_role(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        account: AccountId,
        role: Role,
    ) -> Result<()> {
        Self::require_role(store, caller, Role::Administrator)?;
        store.clear_role(self.module_id, account, role)?;
        tracing::info!(actor = %caller, account = %account, role = %role, "role revoked");
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::RoleRevoked, account.to_string(), caller, None, None),
        )
    }

    // =====================================================================
    // Fee configuration (Onboarding or above)
    // =====================================================================

    /// Values above the bound fail with `FeeTooHigh` and are not clamped.
    pub fn set_default_fee(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        bps: u32,
    ) -> Result<()> {
        Self::require_role_or_admin(store, caller, Role::Onboarding)?;
        store.set_default_fee(self.module_id, bps)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::FeeUpdated, format!("default:{bps}bps"), caller, None, None),
        )
    }

    pub fn set_merchant_fee(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        merchant: AccountId,
        bps: u32,
    ) -> Result<()> {
        Self::require_role_or_admin(store, caller, Role::Onboarding)?;
        store.set_merchant_fee(self.module_id, merchant, bps)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::FeeUpdated, merchant.to_string(), caller, None, None),
        )
    }

    pub fn clear_merchant_fee(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        merchant: AccountId,
    ) -> Result<()> {
        Self::require_role_or_admin(store, caller, Role::Onboarding)?;
        store.clear_merchant_fee(self.module_id, merchant)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::FeeUpdated, merchant.to_string(), caller, None, None),
        )
    }

    // =====================================================================
    // Global asset whitelist (AssetManager)
    // =====================================================================

    pub fn set_asset_listed(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        asset: &str,
        listed: bool,
    ) -> Result<()> {
        Self::require_role(store, caller, Role::AssetManager)?;
        store.set_asset_listed(self.module_id, asset, listed)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::WhitelistUpdated,
                asset,
                caller,
                Some(asset.to_string()),
                None,
            ),
        )
    }

    /// Batch variant: all entries get the same flag, one audit record.
    pub fn set_assets_listed(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        assets: &[String],
        listed: bool,
    ) -> Result<()> {
        Self::require_role(store, caller, Role::AssetManager)?;
        for asset in assets {
            store.set_asset_listed(self.module_id, asset, listed)?;
        }
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::WhitelistUpdated,
                format!("assets:{}", assets.len()),
                caller,
                None,
                None,
            ),
        )
    }

    // =====================================================================
    // Merchant whitelists (Onboarding)
    // =====================================================================

    pub fn set_merchant_listed(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        merchant: AccountId,
        listed: bool,
    ) -> Result<()> {
        Self::require_role(store, caller, Role::Onboarding)?;
        store.set_merchant_listed(self.module_id, merchant, listed)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::WhitelistUpdated, merchant.to_string(), caller, None, None),
        )
    }

    pub fn set_merchants_listed(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        merchants: &[AccountId],
        listed: bool,
    ) -> Result<()> {
        Self::require_role(store, caller, Role::Onboarding)?;
        for merchant in merchants {
            store.set_merchant_listed(self.module_id, *merchant, listed)?;
        }
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::WhitelistUpdated,
                format!("merchants:{}", merchants.len()),
                caller,
                None,
                None,
            ),
        )
    }

    pub fn set_merchant_asset_listed(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        merchant: AccountId,
        asset: &str,
        listed: bool,
    ) -> Result<()> {
        Self::require_role(store, caller, Role::Onboarding)?;
        store.set_merchant_asset_listed(self.module_id, merchant, asset, listed)?;
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::WhitelistUpdated,
                merchant.to_string(),
                caller,
                Some(asset.to_string()),
                None,
            ),
        )
    }

    pub fn set_merchant_assets_listed(
        &self,
        store: &mut LedgerStore,
        caller: AccountId,
        merchant: AccountId,
        assets: &[String],
        listed: bool,
    ) -> Result<()> {
        Self::require_role(store, caller, Role::Onboarding)?;
        for asset in assets {
            store.set_merchant_asset_listed(self.module_id, merchant, asset, listed)?;
        }
        store.append_audit(
            self.module_id,
            AuditRecord::new(
                AuditKind::WhitelistUpdated,
                format!("{merchant}:assets:{}", assets.len()),
                caller,
                None,
                None,
            ),
        )
    }

    // =====================================================================
    // Pause switch (Administrator)
    // =====================================================================

    pub fn pause(&self, store: &mut LedgerStore, caller: AccountId) -> Result<()> {
        Self::require_role(store, caller, Role::Administrator)?;
        store.set_paused(self.module_id, true)?;
        tracing::warn!(actor = %caller, "system paused");
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::Paused, "system", caller, None, None),
        )
    }

    pub fn unpause(&self, store: &mut LedgerStore, caller: AccountId) -> Result<()> {
        Self::require_role(store, caller, Role::Administrator)?;
        store.set_paused(self.module_id, false)?;
        tracing::info!(actor = %caller, "system unpaused");
        store.append_audit(
            self.module_id,
            AuditRecord::new(AuditKind::Unpaused, "system", caller, None, None),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payledger_types::CoreConfig;

    fn setup() -> (LedgerStore, AccessRegistry, AccountId) {
        let admin = AccountId::new();
        let registry = AccessRegistry::new(AccountId::new());
        let mut store = LedgerStore::new(admin, CoreConfig::default()).unwrap();
        store.register_mutator(admin, registry.module_id()).unwrap();
        (store, registry, admin)
    }

    #[test]
    fn admin_grants_and_revokes_roles() {
        let (mut store, registry, admin) = setup();
        let ops = AccountId::new();

        registry
            .grant_role(&mut store, admin, ops, Role::BackendOperator)
            .unwrap();
        assert!(store.has_role(ops, Role::BackendOperator));

        registry
            .revoke_role(&mut store, admin, ops, Role::BackendOperator)
            .unwrap();
        assert!(!store.has_role(ops, Role::BackendOperator));
    }

    #[test]
    fn non_admin_cannot_grant() {
        let (mut store, registry, admin) = setup();
        let onboarder = AccountId::new();
        registry
            .grant_role(&mut store, admin, onboarder, Role::Onboarding)
            .unwrap();

        let err = registry
            .grant_role(&mut store, onboarder, AccountId::new(), Role::Onboarding)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized { .. }));
    }

    #[test]
    fn admin_can_grant_admin_to_others() {
        let (mut store, registry, admin) = setup();
        let second = AccountId::new();
        registry
            .grant_role(&mut store, admin, second, Role::Administrator)
            .unwrap();
        registry
            .grant_role(&mut store, second, AccountId::new(), Role::Onboarding)
            .unwrap();
    }

    #[test]
    fn fee_writes_need_onboarding_or_admin() {
        let (mut store, registry, admin) = setup();
        let onboarder = AccountId::new();
        let stranger = AccountId::new();
        registry
            .grant_role(&mut store, admin, onboarder, Role::Onboarding)
            .unwrap();

        registry.set_default_fee(&mut store, admin, 200).unwrap();
        assert_eq!(store.default_fee_bps(), 200);

        registry.set_default_fee(&mut store, onboarder, 150).unwrap();
        assert_eq!(store.default_fee_bps(), 150);

        let err = registry
            .set_default_fee(&mut store, stranger, 100)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized { .. }));
        assert_eq!(store.default_fee_bps(), 150);
    }

    #[test]
    fn fee_bound_rejected_not_clamped() {
        let (mut store, registry, admin) = setup();
        let merchant = AccountId::new();

        let err = registry
            .set_default_fee(&mut store, admin, 1001)
            .unwrap_err();
        assert!(matches!(err, LedgerError::FeeTooHigh { .. }));
        assert_eq!(store.default_fee_bps(), 100);

        let err = registry
            .set_merchant_fee(&mut store, admin, merchant, 1500)
            .unwrap_err();
        assert!(matches!(err, LedgerError::FeeTooHigh { .. }));
        assert_eq!(store.merchant_fee_override(merchant), None);
    }

    #[test]
    fn merchant_fee_override_and_clear() {
        let (mut store, registry, admin) = setup();
        let merchant = AccountId::new();

        registry
            .set_merchant_fee(&mut store, admin, merchant, 250)
            .unwrap();
        assert_eq!(store.fee_bps_for(merchant), 250);

        registry
            .clear_merchant_fee(&mut store, admin, merchant)
            .unwrap();
        assert_eq!(store.fee_bps_for(merchant), store.default_fee_bps());
    }

    #[test]
    fn asset_whitelist_needs_asset_manager_not_admin() {
        let (mut store, registry, admin) = setup();
        let asset_mgr = AccountId::new();
        registry
            .grant_role(&mut store, admin, asset_mgr, Role::AssetManager)
            .unwrap();

        // Admin does NOT implicitly hold AssetManager.
        let err = registry
            .set_asset_listed(&mut store, admin, "USDC", true)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized { .. }));

        registry
            .set_asset_listed(&mut store, asset_mgr, "USDC", true)
            .unwrap();
        assert!(store.is_asset_listed("USDC"));
    }

    #[test]
    fn batch_whitelists() {
        let (mut store, registry, admin) = setup();
        let asset_mgr = AccountId::new();
        let onboarder = AccountId::new();
        registry
            .grant_role(&mut store, admin, asset_mgr, Role::AssetManager)
            .unwrap();
        registry
            .grant_role(&mut store, admin, onboarder, Role::Onboarding)
            .unwrap();

        let assets = vec!["USDC".to_string(), "XLM".to_string(), "EURT".to_string()];
        registry
            .set_assets_listed(&mut store, asset_mgr, &assets, true)
            .unwrap();
        assert_eq!(store.listed_assets().len(), 3);

        let merchant = AccountId::new();
        registry
            .set_merchant_listed(&mut store, onboarder, merchant, true)
            .unwrap();
        registry
            .set_merchant_assets_listed(&mut store, onboarder, merchant, &assets, true)
            .unwrap();
        assert!(AccessRegistry::is_asset_accepted(&store, merchant, "XLM"));

        registry
            .set_assets_listed(&mut store, asset_mgr, &assets[..1], false)
            .unwrap();
        assert!(!AccessRegistry::is_asset_accepted(&store, merchant, "USDC"));
        assert!(AccessRegistry::is_asset_accepted(&store, merchant, "XLM"));
    }

    #[test]
    fn acceptance_needs_both_lists() {
        let (mut store, registry, admin) = setup();
        let asset_mgr = AccountId::new();
        let onboarder = AccountId::new();
        let merchant = AccountId::new();
        registry
            .grant_role(&mut store, admin, asset_mgr, Role::AssetManager)
            .unwrap();
        registry
            .grant_role(&mut store, admin, onboarder, Role::Onboarding)
            .unwrap();

        registry
            .set_asset_listed(&mut store, asset_mgr, "USDC", true)
            .unwrap();
        assert!(
            !AccessRegistry::is_asset_accepted(&store, merchant, "USDC"),
            "global listing alone is not acceptance"
        );

        registry
            .set_merchant_asset_listed(&mut store, onboarder, merchant, "USDC", true)
            .unwrap();
        assert!(AccessRegistry::is_asset_accepted(&store, merchant, "USDC"));
    }

    #[test]
    fn pause_is_admin_only() {
        let (mut store, registry, admin) = setup();
        let stranger = AccountId::new();

        let err = registry.pause(&mut store, stranger).unwrap_err();
        assert!(matches!(err, LedgerError::NotAuthorized { .. }));
        assert!(!store.is_paused());

        registry.pause(&mut store, admin).unwrap();
        assert!(store.is_paused());
        registry.unpause(&mut store, admin).unwrap();
        assert!(!store.is_paused());
    }

    #[test]
    fn registry_ops_audit() {
        let (mut store, registry, admin) = setup();
        let before = store.audit_count();
        registry
            .grant_role(&mut store, admin, AccountId::new(), Role::Onboarding)
            .unwrap();
        registry.set_default_fee(&mut store, admin, 50).unwrap();
        registry.pause(&mut store, admin).unwrap();
        assert_eq!(store.audit_count(), before + 3);

        // A rejected operation appends nothing.
        let count = store.audit_count();
        let _ = registry.set_default_fee(&mut store, AccountId::new(), 50);
        assert_eq!(store.audit_count(), count);
    }
}
