pub struct RestoreAccountSuccessPage {}
pub struct RestoreAccountMissingTokenPage {}
pub struct RestoreAccountInvalidLinkPage {}
pub struct RestoreAccountAlreadyRestoredPage {}
pub struct RestoreAccountDeletionInProgressPage {}
pub struct RestoreAccountInternalErrorPage {}

fn restore_account_page(heading: &str, detail: &str) -> String {
    format!(
        "<!DOCTYPE html>
         <html>
           <head>
             <title>Roam Account Restoration</title>
             <style>
               body {{
                 font-family: Arial, sans-serif;
               }}
             </style>
           </head>
           <body>
             <h1>{}</h1>
             <h2>{}</h2>
           </body>
         </html>",
        heading, detail,
    )
}

impl RestoreAccountSuccessPage {
    pub fn generate() -> String {
        restore_account_page(
            "Your account has been restored.",
            "Welcome back! You can sign in to Roam again.",
        )
    }
}

impl RestoreAccountMissingTokenPage {
    pub fn generate() -> String {
        restore_account_page(
            "This link is incomplete.",
            "Open the restoration link from your email again, making sure the whole link was \
             copied.",
        )
    }
}

impl RestoreAccountInvalidLinkPage {
    pub fn generate() -> String {
        restore_account_page(
            "This link is invalid.",
            "The account may already have been deleted, or the link may have been mistyped.",
        )
    }
}

impl RestoreAccountAlreadyRestoredPage {
    pub fn generate() -> String {
        restore_account_page(
            "Your account was already restored.",
            "There is nothing else to do. You can sign in to Roam as usual.",
        )
    }
}

impl RestoreAccountDeletionInProgressPage {
    pub fn generate() -> String {
        restore_account_page(
            "Your account is being deleted.",
            "The grace period has ended and deletion has already started, so the account can no \
             longer be restored.",
        )
    }
}

impl RestoreAccountInternalErrorPage {
    pub fn generate() -> String {
        restore_account_page(
            "Something went wrong.",
            "We could not restore your account right now. Please try the link again later.",
        )
    }
}
