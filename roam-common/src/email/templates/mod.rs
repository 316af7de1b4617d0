use std::time::Duration;

pub struct AccountDeletionScheduledMessage {}

impl AccountDeletionScheduledMessage {
    pub fn generate(restoration_url: &str, restoration_token: &str, grace_period: Duration) -> String {
        let link = restoration_link(restoration_url, restoration_token);

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>Your Roam account is scheduled for deletion</h1>
               <p>Your account has been deactivated and will be permanently deleted in \
               <b>{} days</b>, along with your trips and saved places.</p>
               <p>Changed your mind? Restore your account before then:</p>
               <p><a href=\"{}\" rel=\"nofollow\">Restore my account</a></p>
               <br />
               <p><i>If you did not request this, restore your account and change your \
               password.</i></p>
             </body>
             </html>",
            grace_period.as_secs() / (60 * 60 * 24),
            link,
        )
    }
}

pub fn restoration_link(restoration_url: &str, restoration_token: &str) -> String {
    let separator = if restoration_url.contains('?') { '&' } else { '?' };
    format!("{restoration_url}{separator}token={restoration_token}")
}
