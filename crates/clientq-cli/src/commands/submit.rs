use crate::commands::common::{join_text, open_session};
use crate::error::CliError;

pub async fn run_submit(
    title: &str,
    text_parts: &[String],
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let text = join_text(text_parts)?;
    let context = open_session(global_profile).await?;
    let submitted = context
        .directory()?
        .submit(title, &text, context.user())
        .await?;
    println!("Submitted '{}' for approval", submitted.title);
    Ok(())
}
