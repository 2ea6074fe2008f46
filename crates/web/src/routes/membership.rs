//! Membership plans page and subscription.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;
use vibehive_core::models::Membership;
use vibehive_core::{BillingPeriod, MembershipPlan};

use crate::filters;
use crate::middleware::{AuthRejection, OptionalUser};
use crate::notice::Notice;
use crate::services::membership::{self, plan_features};
use crate::state::AppState;
use crate::views::{PageContext, format_date};

/// Subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    pub plan: MembershipPlan,
    #[serde(default)]
    pub period: BillingPeriod,
}

/// One plan card.
#[derive(Clone)]
pub struct PlanCard {
    pub value: &'static str,
    pub name: &'static str,
    pub monthly_price: String,
    pub annual_price: String,
    pub features: &'static [&'static str],
    pub current: bool,
}

/// The visitor's membership as shown above the plans.
#[derive(Clone)]
pub struct MembershipView {
    pub plan_name: &'static str,
    pub active: bool,
    pub expires: String,
}

impl From<&Membership> for MembershipView {
    fn from(membership: &Membership) -> Self {
        Self {
            plan_name: membership.plan.display_name(),
            active: membership.is_active,
            expires: format_date(membership.expire_date),
        }
    }
}

/// Membership page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/membership.html")]
pub struct MembershipTemplate {
    pub ctx: PageContext,
    pub plans: Vec<PlanCard>,
    pub membership: Option<MembershipView>,
}

fn plan_cards(current: Option<&Membership>) -> Vec<PlanCard> {
    MembershipPlan::ALL
        .iter()
        .map(|&plan| PlanCard {
            value: plan.as_str(),
            name: plan.display_name(),
            monthly_price: plan.price(BillingPeriod::Monthly).display(),
            annual_price: plan.price(BillingPeriod::Annual).display(),
            features: plan_features(plan),
            current: current.is_some_and(|m| m.is_active && m.plan == plan),
        })
        .collect()
}

/// Display the plans, with the visitor's current membership when signed in.
#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> impl IntoResponse {
    let current = match ctx.user.as_ref() {
        Some(user) => membership::current_membership(state.api(), &user.email).await,
        None => None,
    };

    MembershipTemplate {
        plans: plan_cards(current.as_ref()),
        membership: current.as_ref().map(MembershipView::from),
        ctx,
    }
}

/// Subscribe to a plan. Anonymous visitors are sent to the login page.
#[instrument(skip(state, user))]
pub async fn subscribe(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Form(form): Form<SubscribeForm>,
) -> Response {
    let Some(user) = user else {
        return AuthRejection::RedirectToLogin {
            redirect: "/membership".to_string(),
            admin_required: false,
            notice: Some(Notice::LoginRequired),
        }
        .into_response();
    };

    match membership::subscribe(state.api(), &user, form.plan, form.period).await {
        Ok(_) => Redirect::to(&Notice::subscribed(form.plan).append_to("/membership")).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Membership purchase failed");
            Redirect::to(&Notice::MembershipFailed.append_to("/membership")).into_response()
        }
    }
}
