//! Console front end: confirmation prompt and the text summaries printed
//! before anything is changed.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::path::Path;

use crate::engine::plan::{InstallPlan, UpdatePlan};
use crate::mods::models::Project;
use crate::storage::Manifest;
use crate::storage::reconcile::ReconcileReport;

pub mod progress;

pub const CONFIRM_PROMPT: &str = "Is this OK? (Y/N) ";

/// Blocking yes/no gate in front of every change.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// Interpret one line of user input; `None` means ask again.
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Prompts on `output` and reads answers line by line from `input`.
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl LinePrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for LinePrompt<R, W> {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        loop {
            write!(self.output, "{prompt}")?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                // Closed stdin can never say yes.
                writeln!(self.output)?;
                return Ok(false);
            }
            if let Some(answer) = parse_answer(&line) {
                return Ok(answer);
            }
        }
    }
}

/// Answers yes without asking, for `--yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> io::Result<bool> {
        Ok(true)
    }
}

pub fn render_search(query: &str, projects: &[Project]) -> String {
    let mut output = String::new();
    if projects.is_empty() {
        let _ = writeln!(&mut output, "There were no results for '{query}'");
        return output;
    }
    let _ = writeln!(&mut output, "Search results for '{query}'");
    for project in projects {
        let stage = if project.is_release_stage() {
            String::new()
        } else {
            format!(" [stage: {}]", project.stage)
        };
        let _ = writeln!(
            &mut output,
            " - {} (slug: {}){stage}",
            project.name, project.slug
        );
    }
    output
}

pub fn render_install_plan(plan: &InstallPlan<'_>, dir: &Path) -> String {
    let mut output = String::new();
    let _ = writeln!(&mut output, "Going to download:");
    for item in &plan.fetchable {
        let _ = writeln!(
            &mut output,
            " - {}: {} ({})",
            item.project.name, item.file.name, item.file.release_type
        );
    }
    let _ = writeln!(&mut output);
    let _ = writeln!(
        &mut output,
        "These will be downloaded directly into {}",
        dir.display()
    );
    output
}

pub fn render_update_summary(plan: &UpdatePlan<'_>, dir: &Path) -> String {
    let mut output = String::new();
    let _ = writeln!(&mut output, "Summary:");
    if !plan.unqualified.is_empty() {
        let _ = writeln!(&mut output, " No change (lacking JARs)");
        for tracked in &plan.unqualified {
            let _ = writeln!(&mut output, " - {}", tracked.project_name);
        }
        let _ = writeln!(&mut output);
    }
    if !plan.up_to_date.is_empty() {
        let _ = writeln!(&mut output, " No change (up to date)");
        for item in &plan.up_to_date {
            let _ = writeln!(
                &mut output,
                " - {} ({})",
                item.tracked.project_name, item.file.name
            );
        }
        let _ = writeln!(&mut output);
    }
    if plan.has_work() {
        let _ = writeln!(&mut output, " Going to update");
        for item in &plan.updates {
            let _ = writeln!(
                &mut output,
                " - {} ({} --> {})",
                item.tracked.project_name, item.tracked.installed_version, item.file.name
            );
        }
        let _ = writeln!(&mut output);
        let _ = writeln!(
            &mut output,
            "These will be downloaded directly into {}",
            dir.display()
        );
    }
    output
}

pub fn render_uninstall_plan(names: &[String]) -> String {
    let mut output = String::new();
    let _ = writeln!(&mut output, "Going to remove:");
    for name in names {
        let _ = writeln!(&mut output, " - {name}");
    }
    output
}

/// Notes about files reconciliation had to track down or give up on.
pub fn render_reconcile(report: &ReconcileReport) -> String {
    let mut output = String::new();
    for renamed in &report.renamed {
        let _ = writeln!(
            &mut output,
            "Found {} under its new name {} (was {})",
            renamed.project_name, renamed.to, renamed.from
        );
    }
    for lost in &report.lost {
        let _ = writeln!(
            &mut output,
            "{} ({}) is gone; no longer tracking it",
            lost.server_mod_name, lost.filename
        );
    }
    output
}

pub fn render_installed(manifest: &Manifest) -> String {
    let mut output = String::new();
    if manifest.is_empty() {
        let _ = writeln!(
            &mut output,
            "Nothing is installed in {} yet",
            manifest.dir().display()
        );
        return output;
    }
    let mut entries: Vec<_> = manifest.entries().values().collect();
    entries.sort_by(|a, b| {
        a.server_mod_name
            .to_lowercase()
            .cmp(&b.server_mod_name.to_lowercase())
    });
    let _ = writeln!(&mut output, "Installed in {}", manifest.dir().display());
    for entry in entries {
        let _ = writeln!(
            &mut output,
            " - {}: {} ({})",
            entry.server_mod_name, entry.filename, entry.file_version
        );
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::plan::{InstallItem, Tracked, UpdateItem};
    use crate::mods::models::ReleaseFile;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn project(slug: &str, name: &str, stage: &str) -> Project {
        Project {
            id: 1,
            slug: slug.into(),
            name: name.into(),
            stage: stage.into(),
        }
    }

    fn remote(name: &str) -> ReleaseFile {
        ReleaseFile {
            file_name: format!("{name}.jar"),
            name: name.into(),
            release_type: "release".into(),
            download_url: format!("https://example.org/{name}.jar"),
            game_version: String::new(),
            project_id: 1,
        }
    }

    fn tracked(name: &str, version: &str) -> Tracked {
        Tracked {
            project_id: 1,
            project_name: name.into(),
            local_name: format!("{name}.jar"),
            installed_version: version.into(),
        }
    }

    #[test]
    fn parses_answers_case_insensitively() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer("YES"), Some(true));
        assert_eq!(parse_answer(" No \r\n"), Some(false));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
        assert_eq!(parse_answer(""), None);
    }

    #[test]
    fn line_prompt_asks_again_until_it_understands() {
        let mut output = Vec::new();
        let answer = LinePrompt::new(Cursor::new("what\n\nYes\n"), &mut output)
            .confirm(CONFIRM_PROMPT)
            .unwrap();
        assert!(answer);
        assert_eq!(String::from_utf8(output).unwrap().matches(CONFIRM_PROMPT).count(), 3);
    }

    #[test]
    fn line_prompt_treats_end_of_input_as_no() {
        let mut output = Vec::new();
        let answer = LinePrompt::new(Cursor::new("hmm\n"), &mut output)
            .confirm(CONFIRM_PROMPT)
            .unwrap();
        assert!(!answer);
    }

    #[test]
    fn search_marks_non_release_stages() {
        let projects = vec![
            project("worldedit", "WorldEdit", "release"),
            project("worldedit-cui", "WorldEdit CUI", "beta"),
        ];
        assert_eq!(
            render_search("worldedit", &projects),
            "Search results for 'worldedit'\n - WorldEdit (slug: worldedit)\n - WorldEdit CUI (slug: worldedit-cui) [stage: beta]\n"
        );
        assert_eq!(
            render_search("nothing", &[]),
            "There were no results for 'nothing'\n"
        );
    }

    #[test]
    fn install_plan_lists_each_download() {
        let we = project("worldedit", "WorldEdit", "release");
        let file = remote("WorldEdit 6.0");
        let plan = InstallPlan {
            fetchable: vec![InstallItem {
                project: &we,
                file: &file,
            }],
            unqualified: vec![],
        };
        let text = render_install_plan(&plan, Path::new("/srv/plugins"));
        assert!(text.contains(" - WorldEdit: WorldEdit 6.0 (release)\n"));
        assert!(text.ends_with("These will be downloaded directly into /srv/plugins\n"));
    }

    #[test]
    fn update_summary_shows_old_and_new_labels() {
        let current = remote("Vault 1.4");
        let newer = remote("WorldEdit 6.1");
        let plan = UpdatePlan {
            up_to_date: vec![UpdateItem {
                tracked: tracked("Vault", "Vault 1.4"),
                file: &current,
            }],
            updates: vec![UpdateItem {
                tracked: tracked("WorldEdit", "WorldEdit 6.0"),
                file: &newer,
            }],
            unqualified: vec![tracked("Legacy", "Legacy 0.1")],
        };
        let text = render_update_summary(&plan, Path::new("/srv/plugins"));
        assert_eq!(
            text,
            "Summary:\n No change (lacking JARs)\n - Legacy\n\n No change (up to date)\n - Vault (Vault 1.4)\n\n Going to update\n - WorldEdit (WorldEdit 6.0 --> WorldEdit 6.1)\n\nThese will be downloaded directly into /srv/plugins\n"
        );
    }
}
