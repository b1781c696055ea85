//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{admin_handler, auth_handler, loan_handler, withdrawal_handler};
use crate::domain::{
    ActivityLogResponse, AdminLoanResponse, DashboardStats, GenerateOtpRequest, LoanAmendment,
    LoanResponse, LoanRevision, LoanStats, OtpResponse, ProcessWithdrawal, RecentActivity,
    UserResponse, UserRole, UserStats, WithdrawalResponse, WithdrawalStats,
};
use crate::services::{AccessTokenResponse, AuthUser, LoginResponse, TokenPair};
use crate::types::{
    ActivityLogPage, AdminLoanPage, LoanPage, MessageResponse, UserPage, WithdrawalPage,
};

/// OpenAPI documentation for the loan servicing API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Loan Servicing API",
        version = "0.1.0",
        description = "Loan applications, OTP-gated withdrawals and an audited admin dashboard"
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    paths(
        // Authentication endpoints
        auth_handler::register,
        auth_handler::login,
        auth_handler::admin_register,
        auth_handler::admin_login,
        auth_handler::refresh,
        auth_handler::logout,
        // Loan endpoints
        loan_handler::apply_for_loan,
        loan_handler::list_loans,
        loan_handler::get_loan,
        loan_handler::update_loan,
        loan_handler::cancel_loan,
        loan_handler::decide_loan,
        // Withdrawal endpoints
        withdrawal_handler::request_withdrawal,
        withdrawal_handler::list_withdrawals,
        withdrawal_handler::get_withdrawal,
        withdrawal_handler::cancel_withdrawal,
        withdrawal_handler::process_withdrawal,
        // Admin endpoints
        admin_handler::stats,
        admin_handler::list_loans,
        admin_handler::get_loan,
        admin_handler::update_loan,
        admin_handler::delete_loan,
        admin_handler::list_users,
        admin_handler::generate_otp,
        admin_handler::activity_logs,
    ),
    components(
        schemas(
            // Domain types
            UserRole,
            UserResponse,
            LoanResponse,
            LoanRevision,
            AdminLoanResponse,
            LoanAmendment,
            WithdrawalResponse,
            ProcessWithdrawal,
            GenerateOtpRequest,
            OtpResponse,
            ActivityLogResponse,
            DashboardStats,
            UserStats,
            LoanStats,
            WithdrawalStats,
            RecentActivity,
            // Pages
            LoanPage,
            AdminLoanPage,
            WithdrawalPage,
            UserPage,
            ActivityLogPage,
            MessageResponse,
            // Auth types
            auth_handler::RegisterRequest,
            auth_handler::LoginRequest,
            auth_handler::AdminRegisterRequest,
            auth_handler::AdminLoginRequest,
            auth_handler::RefreshRequest,
            TokenPair,
            AccessTokenResponse,
            AuthUser,
            LoginResponse,
            // Loan handler types
            loan_handler::LoanCreatedResponse,
            loan_handler::LoanDecisionRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration, login, refresh and logout"),
        (name = "Loans", description = "Borrower loan applications and admin decisions"),
        (name = "Withdrawals", description = "OTP-gated withdrawal requests"),
        (name = "Admin", description = "Dashboard statistics, listings and audited edits")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for JWT Bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token obtained from /api/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/auth/register",
            "/api/loans/{id}/status",
            "/api/withdrawals/{id}/process",
            "/api/admin/loans/{application_number}",
            "/api/admin/activity-logs",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }

    #[test]
    fn test_list_responses_reference_page_schemas() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for (path, schema) in [
            ("/api/loans", "LoanPage"),
            ("/api/admin/loans", "AdminLoanPage"),
            ("/api/admin/users", "UserPage"),
        ] {
            let reference = &doc["paths"][path]["get"]["responses"]["200"]["content"]
                ["application/json"]["schema"]["$ref"];
            assert_eq!(reference, &format!("#/components/schemas/{}", schema));
            assert!(doc["components"]["schemas"][schema].is_object(), "missing {}", schema);
        }
    }
}
