// Command execution: map each CLI command onto the stores and print the
// result as pretty JSON on stdout.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use estimo_api::stores::NoteTarget;
use estimo_api::ApiError;
use estimo_core::filters::{AnalyticsFilter, ClientFilter, EstimateFilter, LogFilter, TemplateFilter};
use estimo_core::models::{ExportedFile, PasswordChange, ProfileUpdate, RegisterRequest};

use crate::app::App;
use crate::cli::{
    AnalyticsCommand, ClientsCommand, Command, EstimateExport, EstimatesCommand, NoteKind,
    NotesCommand, OutArgs, PayloadArgs, TemplatesCommand,
};

/// Run one command against `app`, writing its output to `out`.
pub async fn run(app: &mut App, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Login {
            identifier,
            password,
        } => {
            if let Err(e) = app.stores.auth.login(&identifier, &password).await {
                if let Some(ApiError::AccountInactive { email }) = e.as_api() {
                    let email = email.as_deref().unwrap_or(identifier.as_str());
                    bail!("account {email} is not verified yet; run `estimo verify --email {email} --code <code>`");
                }
                return Err(e).context("login failed");
            }
            print_json(out, &app.stores.auth.user)
        }
        Command::Register {
            login,
            email,
            password,
        } => {
            app.stores
                .auth
                .register(&RegisterRequest {
                    login,
                    email,
                    password,
                })
                .await
                .context("registration failed")?;
            print_json(
                out,
                &json!({ "pending_email": app.stores.auth.pending_email }),
            )
        }
        Command::Verify { email, code } => {
            app.stores
                .auth
                .verify_code(&email, &code)
                .await
                .context("verification failed")?;
            print_json(out, &app.stores.auth.user)
        }
        Command::Resend { email } => {
            app.stores.auth.resend_code(&email).await?;
            print_json(out, &json!({ "sent_to": email }))
        }
        Command::Logout => {
            app.stores.logout()?;
            print_json(out, &json!({ "logged_out": true }))
        }
        Command::Me => {
            require_session(app)?;
            if app.stores.auth.user.is_none() {
                app.stores.auth.fetch_user().await?;
            }
            print_json(out, &app.stores.auth.user)
        }
        Command::Profile(args) => {
            require_session(app)?;
            let update = ProfileUpdate {
                login: args.login,
                email: args.email,
                name: args.name,
                company: args.company,
            };
            app.stores.auth.update_profile(&update).await?;
            print_json(out, &app.stores.auth.user)
        }
        Command::Password {
            current,
            new_password,
            confirm,
        } => {
            require_session(app)?;
            let change = PasswordChange {
                current_password: current,
                new_password,
                confirm_password: confirm,
            };
            app.stores
                .auth
                .change_password(&change)
                .await
                .context("password change failed")?;
            print_json(out, &json!({ "password_changed": true }))
        }
        Command::Estimates(cmd) => {
            require_session(app)?;
            estimates(app, cmd, out).await
        }
        Command::Clients(cmd) => {
            require_session(app)?;
            clients(app, cmd, out).await
        }
        Command::Templates(cmd) => {
            require_session(app)?;
            templates(app, cmd, out).await
        }
        Command::Notes(cmd) => {
            require_session(app)?;
            notes(app, cmd, out).await
        }
        Command::Analytics(cmd) => {
            require_session(app)?;
            analytics(app, cmd, out).await
        }
        Command::Open { path } => {
            let view = app.navigate(&path).await?;
            print_json(out, &view)
        }
    }
}

async fn estimates(app: &mut App, cmd: EstimatesCommand, out: &mut impl Write) -> Result<()> {
    let downloads_dir = app.config.downloads_dir.clone();
    let store = &mut app.stores.estimates;
    match cmd {
        EstimatesCommand::List(args) => {
            let mut filter = EstimateFilter::from(&args);
            filter.limit.get_or_insert(app.config.default_page_limit);
            store.fetch_estimates(&filter).await?;
            print_json(
                out,
                &json!({ "items": store.estimates, "meta": store.pagination }),
            )
        }
        EstimatesCommand::Get { id } => print_json(out, &store.get_estimate_by_id(id).await?),
        EstimatesCommand::Create(payload) => {
            let data = read_payload(&payload)?;
            print_json(out, &store.create_estimate(&data).await?)
        }
        EstimatesCommand::Update { id, payload } => {
            let data = read_payload(&payload)?;
            print_json(out, &store.update_estimate(id, &data).await?)
        }
        EstimatesCommand::Delete { id } => {
            store.delete_estimate(id).await?;
            print_json(out, &json!({ "deleted": id }))
        }
        EstimatesCommand::Versions { id, paging } => print_json(
            out,
            &store
                .get_estimate_versions(id, &LogFilter::from(&paging))
                .await?,
        ),
        EstimatesCommand::Version {
            estimate_id,
            version_id,
        } => print_json(
            out,
            &store.get_estimate_version(version_id, estimate_id).await?,
        ),
        EstimatesCommand::RestoreVersion {
            estimate_id,
            version_id,
        } => {
            store.restore_version(version_id, estimate_id).await?;
            print_json(out, &json!({ "restored": version_id }))
        }
        EstimatesCommand::DeleteVersion {
            estimate_id,
            version_id,
        } => {
            store.delete_version(version_id, estimate_id).await?;
            print_json(out, &json!({ "deleted": version_id }))
        }
        EstimatesCommand::Logs { id, paging } => print_json(
            out,
            &store.get_estimate_logs(id, &LogFilter::from(&paging)).await?,
        ),
        EstimatesCommand::Favorite { id } => {
            store.add_favorite(id).await?;
            print_json(out, &json!({ "favorite": id }))
        }
        EstimatesCommand::Unfavorite { id } => {
            store.remove_favorite(id).await?;
            print_json(out, &json!({ "unfavorite": id }))
        }
        EstimatesCommand::Export {
            id,
            format,
            out: target,
        } => {
            let file = match format {
                EstimateExport::Json => store.export_estimate(id).await?,
                EstimateExport::Pdf => store.download_estimate_pdf(id).await?,
                EstimateExport::Excel => store.download_estimate_excel(id).await?,
            };
            let path = write_export(&file, &target, &downloads_dir)?;
            print_json(out, &json!({ "saved": path.display().to_string() }))
        }
        EstimatesCommand::Import(payload) => {
            store.set_imported_estimate(read_payload(&payload)?);
            let data = store
                .take_imported_estimate()
                .map(without_id)
                .unwrap_or(Value::Null);
            print_json(out, &store.create_estimate(&data).await?)
        }
        EstimatesCommand::Copy { id } => {
            let source = store.get_estimate_by_id(id).await?;
            store.set_copied_estimate(source);
            let data = store
                .copied_estimate
                .clone()
                .map(without_id)
                .unwrap_or(Value::Null);
            let created = store.create_estimate(&data).await;
            store.clear_copied_estimate();
            print_json(out, &created?)
        }
    }
}

async fn clients(app: &mut App, cmd: ClientsCommand, out: &mut impl Write) -> Result<()> {
    let default_limit = app.config.default_page_limit;
    let store = &mut app.stores.clients;
    match cmd {
        ClientsCommand::List(args) => {
            let mut filter = ClientFilter::from(&args);
            filter.limit.get_or_insert(default_limit);
            store.fetch_clients(&filter).await?;
            print_json(
                out,
                &json!({ "items": store.clients, "meta": store.pagination }),
            )
        }
        ClientsCommand::Get {
            id,
            with_estimates: true,
        } => {
            let filter = EstimateFilter {
                limit: Some(default_limit),
                ..Default::default()
            };
            print_json(out, &store.get_client_with_estimates(id, &filter).await?)
        }
        ClientsCommand::Get { id, .. } => print_json(out, &store.get_client_by_id(id).await?),
        ClientsCommand::Create(payload) => {
            let data = read_payload(&payload)?;
            print_json(out, &store.create_client(&data).await?)
        }
        ClientsCommand::Update { id, payload } => {
            let data = read_payload(&payload)?;
            print_json(out, &store.update_client(id, &data).await?)
        }
        ClientsCommand::Delete { id } => {
            store.delete_client(id).await?;
            print_json(out, &json!({ "deleted": id }))
        }
        ClientsCommand::Logs { id, paging } => print_json(
            out,
            &store.get_client_logs(id, &LogFilter::from(&paging)).await?,
        ),
    }
}

async fn templates(app: &mut App, cmd: TemplatesCommand, out: &mut impl Write) -> Result<()> {
    let downloads_dir = app.config.downloads_dir.clone();
    let store = &mut app.stores.templates;
    match cmd {
        TemplatesCommand::List { name } => {
            store.fetch_templates(&TemplateFilter { name }).await?;
            print_json(out, &store.templates)
        }
        TemplatesCommand::Get { id } => print_json(out, &store.get_template_by_id(id).await?),
        TemplatesCommand::Create(payload) => {
            let data = read_payload(&payload)?;
            print_json(out, &store.create_template(&data).await?)
        }
        TemplatesCommand::Update { id, payload } => {
            let data = read_payload(&payload)?;
            print_json(out, &store.update_template(id, &data).await?)
        }
        TemplatesCommand::Delete { id } => {
            store.delete_template(id).await?;
            print_json(out, &json!({ "deleted": id }))
        }
        TemplatesCommand::Export { id, out: target } => {
            let file = store.export_template(id).await?;
            let path = write_export(&file, &target, &downloads_dir)?;
            print_json(out, &json!({ "saved": path.display().to_string() }))
        }
        TemplatesCommand::Import(payload) => {
            store.set_imported_template(read_payload(&payload)?);
            let data = store
                .take_imported_template()
                .map(without_id)
                .unwrap_or(Value::Null);
            print_json(out, &store.create_template(&data).await?)
        }
    }
}

async fn notes(app: &mut App, cmd: NotesCommand, out: &mut impl Write) -> Result<()> {
    let store = &app.stores.notes;
    match cmd {
        NotesCommand::List { kind, id } => {
            print_json(out, &store.fetch_notes(note_target(kind, id)).await?)
        }
        NotesCommand::Add { kind, id, text } => {
            print_json(out, &store.add_note(note_target(kind, id), &text).await?)
        }
        NotesCommand::Update { note_id, text } => {
            print_json(out, &store.update_note(note_id, &text).await?)
        }
        NotesCommand::Delete { note_id } => {
            store.delete_note(note_id).await?;
            print_json(out, &json!({ "deleted": note_id }))
        }
    }
}

async fn analytics(app: &mut App, cmd: AnalyticsCommand, out: &mut impl Write) -> Result<()> {
    let downloads_dir = app.config.downloads_dir.clone();
    let store = &mut app.stores.analytics;
    match cmd {
        AnalyticsCommand::Global(args) => {
            print_json(out, &store.fetch_global(&AnalyticsFilter::from(&args)).await?)
        }
        AnalyticsCommand::Client { id, filter } => print_json(
            out,
            &store
                .fetch_client(id, &AnalyticsFilter::from(&filter))
                .await?,
        ),
        AnalyticsCommand::Export {
            client,
            format,
            filter,
            out: target,
        } => {
            let file = store
                .download_analytics(client, &AnalyticsFilter::from(&filter), format)
                .await?;
            let path = write_export(&file, &target, &downloads_dir)?;
            print_json(out, &json!({ "saved": path.display().to_string() }))
        }
    }
}

fn require_session(app: &App) -> Result<()> {
    if !app.is_authenticated() {
        bail!("not logged in; run `estimo login <identifier>` first");
    }
    Ok(())
}

fn note_target(kind: NoteKind, id: i64) -> NoteTarget {
    match kind {
        NoteKind::Estimate => NoteTarget::Estimate(id),
        NoteKind::Client => NoteTarget::Client(id),
        NoteKind::Template => NoteTarget::Template(id),
    }
}

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode output")?;
    writeln!(out)?;
    Ok(())
}

fn read_payload(args: &PayloadArgs) -> Result<Value> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", args.file.display()))
}

/// Drop the server-assigned id so the payload creates a new entity.
fn without_id(mut data: Value) -> Value {
    if let Some(obj) = data.as_object_mut() {
        obj.remove("id");
    }
    data
}

/// Resolve where an export lands. `--out` may name a file or an existing
/// directory; without it the file goes to the downloads directory under its
/// suggested name.
pub fn export_path(file_name: &str, out: &OutArgs, downloads_dir: &Path) -> PathBuf {
    match &out.out {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path.clone(),
        None => downloads_dir.join(file_name),
    }
}

pub fn write_export(file: &ExportedFile, out: &OutArgs, downloads_dir: &Path) -> Result<PathBuf> {
    let path = export_path(&file.file_name, out, downloads_dir);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = file.bytes.len(), "export saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("estimo_commands_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn export_path_defaults_to_downloads_dir() {
        let path = export_path("a.pdf", &OutArgs::default(), Path::new("dl"));
        assert_eq!(path, PathBuf::from("dl/a.pdf"));
    }

    #[test]
    fn export_path_into_existing_directory() {
        let dir = temp_dir("outdir");
        let out = OutArgs {
            out: Some(dir.clone()),
        };
        assert_eq!(export_path("a.csv", &out, Path::new("dl")), dir.join("a.csv"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_export_creates_parent_dirs() {
        let dir = temp_dir("write");
        let out = OutArgs {
            out: Some(dir.join("nested/report.xlsx")),
        };
        let file = ExportedFile {
            file_name: "analytics.xlsx".into(),
            content_type: None,
            bytes: b"PK".to_vec(),
        };

        let path = write_export(&file, &out, Path::new("unused")).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"PK");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn without_id_strips_only_top_level_id() {
        let data = without_id(json!({"id": 3, "name": "x", "items": [{"id": 1}]}));
        assert_eq!(data, json!({"name": "x", "items": [{"id": 1}]}));
    }
}
