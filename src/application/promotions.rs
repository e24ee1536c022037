//! Promotion management and code validation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::orders::normalized_code;
use super::AppState;
use crate::domain::aggregates::{
    DiscountType, PricingBreakdown, Promotion, PromotionScope, PromotionTarget, PromotionTerms, TargetType,
};
use crate::domain::services::pricing;
use crate::domain::value_objects::Money;
use crate::infrastructure::repositories::promotions;
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct PromotionRequest {
    #[validate(length(min = 1, max = 40))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    pub scope: PromotionScope,
    #[serde(default)]
    pub min_order_value: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(max = 1_000_000_000))]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    #[validate]
    pub targets: Vec<TargetRequest>,
}

impl PromotionRequest {
    fn terms(&self) -> PromotionTerms {
        PromotionTerms {
            code: self.code.clone(),
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            max_discount: self.max_discount.map(Money::vnd),
            scope: self.scope,
            min_order_value: Money::vnd(self.min_order_value),
            start_date: self.start_date,
            end_date: self.end_date,
            usage_limit: self.usage_limit,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TargetRequest {
    pub target_type: TargetType,
    #[validate(length(min = 1))]
    pub target_ref: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TargetsRequest {
    #[validate]
    pub targets: Vec<TargetRequest>,
}

#[derive(Debug, Deserialize)]
pub struct PromotionListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct ValidateCodeRequest {
    pub code: String,
    pub subtotal: Decimal,
    pub shipping_fee: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct PromotionDetail {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub targets: Vec<PromotionTarget>,
}

#[derive(Debug, Serialize)]
pub struct CodeValidation {
    pub promotion: Promotion,
    pub pricing: PricingBreakdown,
}

pub struct PromotionService<'a> {
    state: &'a AppState,
}

impl<'a> PromotionService<'a> {
    pub fn new(state: &'a AppState) -> Self { Self { state } }

    pub async fn list(&self, query: PromotionListQuery) -> Result<Vec<Promotion>> {
        promotions::list(self.state.pool(), query.include_inactive).await
    }

    pub async fn get(&self, promotion_id: &str) -> Result<PromotionDetail> {
        let promotion = self.find(promotion_id).await?;
        let targets = promotions::targets_for(self.state.pool(), promotion_id).await?;
        Ok(PromotionDetail { promotion, targets })
    }

    pub async fn create(&self, req: PromotionRequest) -> Result<PromotionDetail> {
        req.validate()?;
        let promotion = Promotion::create(Uuid::new_v4().to_string(), req.terms())?;
        let targets = to_targets(&promotion.promotion_id, req.targets);
        let mut tx = self.state.pool().begin().await?;
        promotions::insert(&mut *tx, &promotion).await?;
        promotions::replace_targets(&mut tx, &promotion.promotion_id, &targets).await?;
        tx.commit().await?;
        tracing::info!(
            promotion_id = %promotion.promotion_id,
            code = %promotion.code,
            scope = promotion.scope.as_str(),
            "Promotion created"
        );
        Ok(PromotionDetail { promotion, targets })
    }

    /// Revises the terms; targets are only replaced when the request lists some.
    pub async fn update(&self, promotion_id: &str, req: PromotionRequest) -> Result<PromotionDetail> {
        req.validate()?;
        let mut tx = self.state.pool().begin().await?;
        let mut promotion = promotions::find(&mut *tx, promotion_id)
            .await?
            .ok_or_else(|| EcommerceError::PromotionNotFound(promotion_id.to_string()))?;
        promotion.revise(req.terms())?;
        promotions::update(&mut *tx, &promotion).await?;
        if !req.targets.is_empty() {
            let targets = to_targets(promotion_id, req.targets);
            promotions::replace_targets(&mut tx, promotion_id, &targets).await?;
        }
        let targets = promotions::targets_for(&mut *tx, promotion_id).await?;
        tx.commit().await?;
        tracing::info!(promotion_id, code = %promotion.code, "Promotion updated");
        Ok(PromotionDetail { promotion, targets })
    }

    pub async fn deactivate(&self, promotion_id: &str) -> Result<Promotion> {
        let mut promotion = self.find(promotion_id).await?;
        promotion.deactivate();
        promotions::update(self.state.pool(), &promotion).await?;
        tracing::info!(promotion_id, code = %promotion.code, "Promotion deactivated");
        Ok(promotion)
    }

    pub async fn replace_targets(&self, promotion_id: &str, req: TargetsRequest) -> Result<PromotionDetail> {
        req.validate()?;
        let mut tx = self.state.pool().begin().await?;
        let promotion = promotions::find(&mut *tx, promotion_id)
            .await?
            .ok_or_else(|| EcommerceError::PromotionNotFound(promotion_id.to_string()))?;
        let targets = to_targets(promotion_id, req.targets);
        promotions::replace_targets(&mut tx, promotion_id, &targets).await?;
        let targets = promotions::targets_for(&mut *tx, promotion_id).await?;
        tx.commit().await?;
        tracing::info!(promotion_id, targets = targets.len(), "Promotion targets replaced");
        Ok(PromotionDetail { promotion, targets })
    }

    /// Checks a checkout code against an order subtotal and returns the
    /// breakdown it would produce.
    pub async fn validate_code(&self, req: ValidateCodeRequest) -> Result<CodeValidation> {
        let code = normalized_code(Some(&req.code))
            .ok_or_else(|| EcommerceError::Validation("code is required".into()))?;
        if req.subtotal.is_sign_negative() {
            return Err(EcommerceError::Validation("subtotal must not be negative".into()));
        }
        let promotion = promotions::find_by_code(self.state.pool(), &code)
            .await?
            .ok_or_else(|| EcommerceError::PromotionNotFound(code.clone()))?;
        let config = &self.state.config().pricing;
        let shipping_fee = Money::vnd(req.shipping_fee.unwrap_or(config.shipping_fee));
        let pricing = pricing::quote(&Money::vnd(req.subtotal), &shipping_fee, Some(&promotion), config.vat_rate, Utc::now())?;
        Ok(CodeValidation { promotion, pricing })
    }

    async fn find(&self, promotion_id: &str) -> Result<Promotion> {
        promotions::find(self.state.pool(), promotion_id)
            .await?
            .ok_or_else(|| EcommerceError::PromotionNotFound(promotion_id.to_string()))
    }
}

fn to_targets(promotion_id: &str, requests: Vec<TargetRequest>) -> Vec<PromotionTarget> {
    requests
        .into_iter()
        .map(|t| PromotionTarget {
            promotion_id: promotion_id.to_string(),
            target_type: t.target_type,
            target_ref: t.target_ref.into_iter().map(|r| r.trim().to_string()).filter(|r| !r.is_empty()).collect(),
        })
        .filter(|t| !t.target_ref.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_targets_drops_blank_refs() {
        let targets = to_targets(
            "p1",
            vec![
                TargetRequest { target_type: TargetType::Brand, target_ref: vec![" Laneige ".into(), "  ".into()] },
                TargetRequest { target_type: TargetType::Category, target_ref: vec![" ".into()] },
            ],
        );
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].target_ref, vec!["Laneige".to_string()]);
        assert_eq!(targets[0].promotion_id, "p1");
    }

    #[test]
    fn test_promotion_request_parses_buy1get1() {
        let req: PromotionRequest = serde_json::from_str(
            r#"{"code":"b1g1","name":"Buy one","discount_type":"buy1get1","discount_value":"0","scope":"product",
                "start_date":"2024-01-01T00:00:00Z","end_date":"2024-12-31T00:00:00Z",
                "targets":[{"target_type":"product","target_ref":["SKU-1"]}]}"#,
        )
        .unwrap();
        assert_eq!(req.discount_type, DiscountType::Buy1Get1);
        assert!(req.validate().is_ok());
        let promotion = Promotion::create("p", req.terms()).unwrap();
        assert_eq!(promotion.code, "B1G1");
    }
}
