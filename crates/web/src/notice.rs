//! Flash notices carried through redirects.
//!
//! A handler that redirects after a form post appends `?success=<code>`,
//! `?error=<code>` or `?info=<code>` to the target. The next page load turns
//! the code back into a [`Notice`] and renders its banner. Only known codes are
//! rendered, so the query string cannot inject text into the page.

use serde::Deserialize;
use vibehive_core::MembershipPlan;

use crate::identity::IdentityErrorCode;

/// Banner style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    /// Query parameter carrying the code.
    #[must_use]
    pub const fn query_key(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

macro_rules! notices {
    ($($variant:ident => ($code:literal, $kind:ident, $message:literal),)+) => {
        /// Every banner the forum can show.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Notice {
            $($variant,)+
        }

        impl Notice {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Code used in the query string.
            #[must_use]
            pub const fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            #[must_use]
            pub const fn kind(self) -> NoticeKind {
                match self {
                    $(Self::$variant => NoticeKind::$kind,)+
                }
            }

            #[must_use]
            pub const fn message(self) -> &'static str {
                match self {
                    $(Self::$variant => $message,)+
                }
            }
        }
    };
}

notices! {
    // Voting and comments
    VoteLoginRequired => ("vote_login_required", Error, "Please log in to vote on posts!"),
    CommentLoginRequired => ("comment_login_required", Error, "Please log in to comment on posts!"),
    CommentEmpty => ("comment_empty", Error, "Please enter a comment before submitting."),
    VoteFailed => ("vote_failed", Error, "Failed to vote. Please try again."),
    CommentFailed => ("comment_failed", Error, "Failed to post comment. Please try again."),
    Upvoted => ("upvoted", Success, "Upvoted successfully!"),
    Downvoted => ("downvoted", Success, "Downvoted successfully!"),
    CommentPosted => ("comment_posted", Success, "Comment posted successfully!"),
    ReportFeedbackRequired => ("report_feedback_required", Error, "Please select a feedback before reporting"),
    CommentReported => ("comment_reported", Success, "Comment reported successfully"),
    ReportFailed => ("report_failed", Error, "Failed to report comment. Please try again."),
    CommentsUnavailable => ("comments_unavailable", Error, "Failed to load comments"),

    // Posts
    PostLimit => ("post_limit", Error, "You have reached the limit of 5 posts per day. Become a member to post more!"),
    NotPostAuthor => ("not_post_author", Error, "You can only edit your own posts"),
    PostAdded => ("post_added", Success, "Post added successfully!"),
    PostUpdated => ("post_updated", Success, "Post updated successfully!"),
    PostDeleted => ("post_deleted", Success, "Post deleted successfully!"),
    PostAddFailed => ("post_add_failed", Error, "Failed to add post. Please try again."),
    PostUpdateFailed => ("post_update_failed", Error, "Failed to update post. Please try again."),
    PostDeleteFailed => ("post_delete_failed", Error, "Failed to delete post. Please try again."),
    PostLoadFailed => ("post_load_failed", Error, "Failed to fetch post data. Please try again."),

    // Access
    LoginRequired => ("login_required", Info, "Please log in to continue."),
    AdminRequired => ("admin_required", Error, "Admin access is required for that page."),
    AdminVerifyFailed => ("admin_verify_failed", Error, "Error verifying admin permissions"),
    NotAdmin => ("not_admin", Error, "This account does not have admin access."),

    // Registration and login
    Registered => ("registered", Success, "Registration successful! Welcome to VibeHive!"),
    UserSyncFailed => ("user_sync_failed", Info, "Account created but failed to sync with server. Please try logging in again."),
    LoggedIn => ("logged_in", Success, "Login Successful"),
    LoggedOut => ("logged_out", Success, "You have been logged out."),
    SessionError => ("session_error", Error, "Your session could not be saved. Please try again."),
    LoginFailed => ("login_failed", Error, "Login failed. Please try again."),
    RegistrationFailed => ("registration_failed", Error, "Registration failed. Please try again."),
    EmailExists => ("email_exists", Error, "This email is already registered. Please use a different email."),
    EmailNotFound => ("email_not_found", Error, "No account found with this email address."),
    InvalidPassword => ("invalid_password", Error, "Incorrect password. Please try again."),
    InvalidCredentials => ("invalid_credentials", Error, "Incorrect email or password. Please try again."),
    InvalidEmail => ("invalid_email", Error, "Please enter a valid email address."),
    WeakPassword => ("weak_password", Error, "Password is too weak. Please choose a stronger password."),
    TooManyAttempts => ("too_many_attempts", Error, "Too many failed attempts. Please try again later."),
    UserDisabled => ("user_disabled", Error, "This account has been disabled."),
    GoogleSignedIn => ("google_signed_in", Success, "Google sign-in successful!"),
    GoogleSyncFailed => ("google_sync_failed", Info, "Signed in successfully but failed to sync with server."),
    GoogleCancelled => ("google_cancelled", Error, "Sign-in cancelled. Please try again."),
    GoogleFailed => ("google_failed", Error, "Google sign-in failed. Please try again."),
    GoogleUnavailable => ("google_unavailable", Error, "Google sign-in is not available right now."),

    // Profiles
    ProfileUnavailable => ("profile_unavailable", Error, "Failed to load profile details. Please try again later."),

    // Membership
    SubscribedBasic => ("subscribed_basic", Success, "Successfully subscribed to Forum Explorer plan!"),
    SubscribedPremium => ("subscribed_premium", Success, "Successfully subscribed to Forum Master plan!"),
    MembershipFailed => ("membership_failed", Error, "Failed to activate membership. Please try again."),

    // Admin
    AlreadyAdmin => ("already_admin", Info, "User is already an admin"),
    RoleUpdated => ("role_updated", Success, "User role updated successfully"),
    RoleUpdateFailed => ("role_update_failed", Error, "Failed to update user role"),
    AnnouncementFieldsRequired => ("announcement_fields_required", Error, "Title and description are required"),
    AnnouncementPosted => ("announcement_posted", Success, "Announcement posted successfully!"),
    AnnouncementFailed => ("announcement_failed", Error, "Failed to post announcement. Please try again."),
    TagAdded => ("tag_added", Success, "Tag added successfully"),
    TagDeleted => ("tag_deleted", Success, "Tag deleted successfully"),
    TagInvalid => ("tag_invalid", Error, "Please enter a tag name"),
    TagFailed => ("tag_failed", Error, "Failed to update tags. Please try again."),

    // Notifications
    NotificationsRead => ("notifications_read", Success, "All notifications marked as read"),
}

impl Notice {
    /// Look up a notice by its query code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|notice| notice.code() == code)
    }

    /// Success notice for a fresh subscription.
    #[must_use]
    pub const fn subscribed(plan: MembershipPlan) -> Self {
        match plan {
            MembershipPlan::Basic => Self::SubscribedBasic,
            MembershipPlan::Premium => Self::SubscribedPremium,
        }
    }

    /// Append this notice to a redirect target.
    #[must_use]
    pub fn append_to(self, target: &str) -> String {
        let separator = if target.contains('?') { '&' } else { '?' };
        format!(
            "{target}{separator}{}={}",
            self.kind().query_key(),
            self.code()
        )
    }

    /// Identity provider failure as a notice, with a per-flow fallback.
    #[must_use]
    pub const fn from_identity(code: Option<IdentityErrorCode>, fallback: Self) -> Self {
        match code {
            Some(IdentityErrorCode::EmailExists) => Self::EmailExists,
            Some(IdentityErrorCode::EmailNotFound) => Self::EmailNotFound,
            Some(IdentityErrorCode::InvalidPassword) => Self::InvalidPassword,
            Some(IdentityErrorCode::InvalidCredentials) => Self::InvalidCredentials,
            Some(IdentityErrorCode::InvalidEmail) => Self::InvalidEmail,
            Some(IdentityErrorCode::WeakPassword) => Self::WeakPassword,
            Some(IdentityErrorCode::TooManyAttempts) => Self::TooManyAttempts,
            Some(IdentityErrorCode::UserDisabled) => Self::UserDisabled,
            Some(IdentityErrorCode::Other) | None => fallback,
        }
    }
}

/// Notice codes as they arrive in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
}

impl NoticeQuery {
    /// The notice to render. Errors win over info, info over success.
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        [
            (self.error.as_deref(), NoticeKind::Error),
            (self.info.as_deref(), NoticeKind::Info),
            (self.success.as_deref(), NoticeKind::Success),
        ]
        .into_iter()
        .filter_map(|(code, kind)| Some((Notice::from_code(code?)?, kind)))
        .find(|(notice, kind)| notice.kind() == *kind)
        .map(|(notice, _)| notice)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<&str> = Notice::ALL.iter().map(|n| n.code()).collect();
        assert_eq!(codes.len(), Notice::ALL.len());
    }

    #[test]
    fn test_from_code() {
        assert_eq!(
            Notice::from_code("vote_login_required"),
            Some(Notice::VoteLoginRequired)
        );
        assert_eq!(Notice::from_code("<script>"), None);
    }

    #[test]
    fn test_append_to() {
        assert_eq!(
            Notice::PostAdded.append_to("/"),
            "/?success=post_added"
        );
        assert_eq!(
            Notice::AdminRequired.append_to("/login?admin_required=true"),
            "/login?admin_required=true&error=admin_required"
        );
    }

    #[test]
    fn test_query_kind_must_match() {
        let query = NoticeQuery {
            success: Some("vote_failed".to_string()),
            ..NoticeQuery::default()
        };
        assert_eq!(query.notice(), None);

        let query = NoticeQuery {
            error: Some("vote_failed".to_string()),
            success: Some("upvoted".to_string()),
            ..NoticeQuery::default()
        };
        assert_eq!(query.notice(), Some(Notice::VoteFailed));
    }

    #[test]
    fn test_identity_mapping_falls_back() {
        assert_eq!(
            Notice::from_identity(Some(IdentityErrorCode::EmailExists), Notice::RegistrationFailed),
            Notice::EmailExists
        );
        assert_eq!(
            Notice::from_identity(Some(IdentityErrorCode::Other), Notice::LoginFailed),
            Notice::LoginFailed
        );
        assert_eq!(
            Notice::from_identity(None, Notice::RegistrationFailed),
            Notice::RegistrationFailed
        );
    }

    #[test]
    fn test_subscribed_message_names_plan() {
        assert!(
            Notice::subscribed(MembershipPlan::Premium)
                .message()
                .contains(MembershipPlan::Premium.display_name())
        );
    }
}
