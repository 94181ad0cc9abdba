use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::recovery;
use crate::io::settings_io::resolve_data_dir;
use crate::model::keyword::KeywordDraft;
use crate::ops::keyword_ops::draft_for;
use crate::ops::package::SchemaError;
use crate::ops::selection::Selection;
use crate::ops::template::CopyMode;
use crate::ops::{NameKind, ValidationError};
use crate::parse::keyword_parser::parse_runs;
use crate::workspace::{Command, Outcome, Workspace};

type CmdResult = Result<(), Box<dyn Error>>;

/// Path options given on the command line; unset levels come from the
/// saved selection.
struct PathFlags {
    vendor: Option<String>,
    issue: Option<String>,
    category: Option<String>,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let dir = resolve_data_dir(cli.data_dir.as_deref());
    let flags = PathFlags {
        vendor: cli.vendor,
        issue: cli.issue,
        category: cli.category,
    };

    // The recovery log is readable even when the data files are not.
    let command = match cli.command {
        Commands::Recovery(args) => return cmd_recovery(&dir, args, json),
        other => other,
    };

    let mut ws = Workspace::open(&dir)?;
    let result = match command {
        Commands::Init => cmd_init(&ws, json),
        Commands::Select(args) => cmd_select(&mut ws, &flags, args, json),
        Commands::Vendors => cmd_vendors(&ws, json),
        Commands::Issues => cmd_issues(&ws, &flags, json),
        Commands::Categories => cmd_categories(&ws, &flags, json),
        Commands::Issue(args) => cmd_issue(&mut ws, &flags, args.action, json),
        Commands::Category(args) => cmd_category(&mut ws, &flags, args.action, json),
        Commands::List => cmd_list(&ws, &flags, json),
        Commands::Kw(args) => cmd_kw(&mut ws, &flags, args.action, json),
        Commands::Param(args) => cmd_param(&mut ws, &flags, args.action, json),
        Commands::Delimiter(args) => cmd_delimiter(&mut ws, &flags, args, json),
        Commands::Copy(args) => cmd_copy(&mut ws, &flags, args),
        Commands::Placeholders(args) => cmd_placeholders(&mut ws, &flags, args, json),
        Commands::Export(args) => cmd_export(&ws, args, json),
        Commands::Import(args) => cmd_import(&mut ws, args, json),
        Commands::Recovery(args) => cmd_recovery(&dir, args, json),
    };
    // Saves that failed during the command get one more try.
    let closed = ws.close();
    result?;
    closed?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The category a command works on: explicit flags first, the saved
/// selection for the rest. A level named explicitly must exist.
fn target(ws: &Workspace, flags: &PathFlags) -> Result<Selection, ValidationError> {
    let current = ws.selection().cloned().unwrap_or_default();
    let vendor_given = flags.vendor.is_some();
    let issue_given = flags.issue.is_some();
    let wanted = Selection {
        vendor: flags.vendor.clone().unwrap_or(current.vendor),
        issue: match &flags.issue {
            Some(i) => i.clone(),
            None if vendor_given => String::new(),
            None => current.issue,
        },
        category: match &flags.category {
            Some(c) => c.clone(),
            None if vendor_given || issue_given => String::new(),
            None => current.category,
        },
    };

    let resolved = wanted
        .resolve(ws.catalog(), ws.config())
        .ok_or_else(|| ValidationError::not_found(NameKind::Vendor, &wanted.vendor))?;
    if let Some(v) = &flags.vendor
        && *v != resolved.vendor
    {
        return Err(ValidationError::not_found(NameKind::Vendor, v));
    }
    if let Some(i) = &flags.issue
        && *i != resolved.issue
    {
        return Err(ValidationError::not_found(NameKind::Issue, i));
    }
    if let Some(c) = &flags.category
        && *c != resolved.category
    {
        return Err(ValidationError::not_found(NameKind::Category, c));
    }
    Ok(resolved)
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_change(action: &str, outcome: &Outcome, message: String, json: bool) -> CmdResult {
    if json {
        let (name, index) = match outcome {
            Outcome::Name(n) => (Some(n.clone()), None),
            Outcome::Index(i) => (None, Some(*i)),
            _ => (None, None),
        };
        return print_json(&ChangeJson {
            action: action.to_string(),
            name,
            index,
            changed: *outcome != Outcome::Unchanged,
        });
    }
    println!("{}", message);
    Ok(())
}

fn path_label(sel: &Selection) -> String {
    format!("{} / {} / {}", sel.vendor, sel.issue, sel.category)
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_init(ws: &Workspace, json: bool) -> CmdResult {
    let report = ws.load_report();
    let mut repaired = Vec::new();
    if report.catalog_rewritten {
        repaired.push("keywords_db.json".to_string());
    }
    if report.config_rewritten {
        repaired.push("issues_config.json".to_string());
    }
    let vendors = vendors_to_json(ws.catalog(), ws.config());

    if json {
        return print_json(&InitJson {
            data_dir: ws.dir().display().to_string(),
            seeded: report.seeded,
            repaired,
            vendors,
        });
    }

    if report.seeded {
        println!("Created default catalog in {}", ws.dir().display());
    } else {
        println!("Data directory: {}", ws.dir().display());
    }
    for file in &repaired {
        println!("  repaired {}", file);
    }
    for v in &vendors {
        println!(
            "  {}: {} issue(s), delimiter {}",
            v.name,
            v.issues.len(),
            show_delimiter(&v.delimiter)
        );
    }
    Ok(())
}

fn cmd_select(ws: &mut Workspace, flags: &PathFlags, args: SelectArgs, json: bool) -> CmdResult {
    let flags = PathFlags {
        vendor: args.vendor.or_else(|| flags.vendor.clone()),
        issue: args.issue.or_else(|| flags.issue.clone()),
        category: args.category.or_else(|| flags.category.clone()),
    };
    let explicit = flags.vendor.is_some() || flags.issue.is_some() || flags.category.is_some();
    let sel = target(ws, &flags)?;
    let sel = if explicit {
        ws.select(&sel)?.unwrap_or(sel)
    } else {
        sel
    };

    if json {
        return print_json(&sel);
    }
    println!("{}", path_label(&sel));
    Ok(())
}

fn cmd_vendors(ws: &Workspace, json: bool) -> CmdResult {
    let vendors = vendors_to_json(ws.catalog(), ws.config());
    if json {
        return print_json(&vendors);
    }
    let rows: Vec<Vec<String>> = vendors
        .iter()
        .map(|v| {
            vec![
                v.name.clone(),
                show_delimiter(&v.delimiter),
                v.issues.len().to_string(),
                v.keywords.to_string(),
            ]
        })
        .collect();
    print!(
        "{}",
        format_table(&["vendor", "delimiter", "issues", "keywords"], &rows)
    );
    Ok(())
}

fn cmd_issues(ws: &Workspace, flags: &PathFlags, json: bool) -> CmdResult {
    let sel = target(ws, flags)?;
    let issues = ws.config().issues(&sel.vendor);
    if json {
        return print_json(&issues);
    }
    for name in issues {
        let marker = if *name == sel.issue { "*" } else { " " };
        println!("{} {}", marker, name);
    }
    Ok(())
}

fn cmd_categories(ws: &Workspace, flags: &PathFlags, json: bool) -> CmdResult {
    let sel = target(ws, flags)?;
    let issue = ws
        .catalog()
        .issue(&sel.vendor, &sel.issue)
        .ok_or_else(|| ValidationError::not_found(NameKind::Issue, &sel.issue))?;
    let cats: Vec<CategoryJson> = issue
        .categories
        .iter()
        .map(|(name, c)| CategoryJson {
            name: name.clone(),
            keywords: c.keywords.len(),
            params: c.params.len(),
        })
        .collect();
    if json {
        return print_json(&cats);
    }
    let rows: Vec<Vec<String>> = cats
        .iter()
        .map(|c| {
            let marker = if c.name == sel.category { "*" } else { "" };
            vec![
                marker.to_string(),
                c.name.clone(),
                c.keywords.to_string(),
                c.params.to_string(),
            ]
        })
        .collect();
    print!(
        "{}",
        format_table(&["", "category", "keywords", "params"], &rows)
    );
    Ok(())
}

fn cmd_list(ws: &Workspace, flags: &PathFlags, json: bool) -> CmdResult {
    let sel = target(ws, flags)?;
    let category = ws.category(&sel)?;
    let delimiter = ws.delimiter(&sel.vendor);

    if json {
        let items: Vec<KeywordJson> = category
            .keywords
            .iter()
            .enumerate()
            .map(|(i, kw)| keyword_to_json(i, kw, category, delimiter))
            .collect();
        return print_json(&items);
    }

    println!("{}", path_label(&sel));
    if category.keywords.is_empty() {
        println!("(no keywords)");
        return Ok(());
    }
    print!(
        "{}",
        format_table(
            &["#", "summary", "group", "keyword", "preview"],
            &keyword_rows(category, delimiter)
        )
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Issue and category commands
// ---------------------------------------------------------------------------

fn cmd_issue(ws: &mut Workspace, flags: &PathFlags, action: NameAction, json: bool) -> CmdResult {
    let sel = target(ws, flags)?;
    let vendor = sel.vendor;
    match action {
        NameAction::Add(a) => {
            let out = ws.execute(Command::AddIssue {
                vendor: vendor.clone(),
                name: a.name,
            })?;
            let msg = format!("Added issue {} to {}", outcome_name(&out), vendor);
            print_change("issue_add", &out, msg, json)
        }
        NameAction::Rm(a) => {
            let out = ws.execute(Command::DeleteIssue {
                vendor: vendor.clone(),
                name: a.name.clone(),
            })?;
            let msg = format!("Deleted issue {} from {}", a.name, vendor);
            print_change("issue_rm", &out, msg, json)
        }
        NameAction::Mv(a) => {
            let out = ws.execute(Command::RenameIssue {
                vendor,
                old: a.old.clone(),
                new: a.new,
            })?;
            let msg = format!("Renamed issue {} -> {}", a.old, outcome_name(&out));
            print_change("issue_mv", &out, msg, json)
        }
    }
}

fn cmd_category(
    ws: &mut Workspace,
    flags: &PathFlags,
    action: NameAction,
    json: bool,
) -> CmdResult {
    // The category flag names the category to act on, not the location.
    let location = PathFlags {
        vendor: flags.vendor.clone(),
        issue: flags.issue.clone(),
        category: None,
    };
    let sel = target(ws, &location)?;
    let (vendor, issue) = (sel.vendor, sel.issue);
    match action {
        NameAction::Add(a) => {
            let out = ws.execute(Command::AddCategory {
                vendor,
                issue: issue.clone(),
                name: a.name,
            })?;
            let msg = format!("Added category {} to {}", outcome_name(&out), issue);
            print_change("category_add", &out, msg, json)
        }
        NameAction::Rm(a) => {
            let out = ws.execute(Command::DeleteCategory {
                vendor,
                issue: issue.clone(),
                name: a.name.clone(),
            })?;
            let msg = format!("Deleted category {} from {}", a.name, issue);
            print_change("category_rm", &out, msg, json)
        }
        NameAction::Mv(a) => {
            let out = ws.execute(Command::RenameCategory {
                vendor,
                issue,
                old: a.old.clone(),
                new: a.new,
            })?;
            let msg = format!("Renamed category {} -> {}", a.old, outcome_name(&out));
            print_change("category_mv", &out, msg, json)
        }
    }
}

fn outcome_name(out: &Outcome) -> &str {
    match out {
        Outcome::Name(n) => n.as_str(),
        _ => "",
    }
}

// ---------------------------------------------------------------------------
// Keyword commands
// ---------------------------------------------------------------------------

fn cmd_kw(ws: &mut Workspace, flags: &PathFlags, action: KwAction, json: bool) -> CmdResult {
    let at = target(ws, flags)?;
    match action {
        KwAction::Add(args) => {
            let mut draft = KeywordDraft::with_parts(args.parts);
            apply_meta(&mut draft, args.meta)?;
            let out = ws.execute(Command::AddKeyword { at, draft })?;
            let msg = format!("Added keyword #{}", outcome_index(&out));
            print_change("kw_add", &out, msg, json)
        }
        KwAction::Edit(args) => {
            let category = ws.category(&at)?;
            let existing = category.keywords.get(args.index).ok_or(
                ValidationError::IndexOutOfRange {
                    index: args.index,
                    len: category.keywords.len(),
                },
            )?;
            let mut draft = draft_for(existing, ws.delimiter(&at.vendor));
            if !args.parts.is_empty() {
                draft.parts = args.parts;
            }
            apply_meta(&mut draft, args.meta)?;
            let out = ws.execute(Command::EditKeyword {
                at,
                index: args.index,
                draft,
            })?;
            let msg = format!("Updated keyword #{}", args.index);
            print_change("kw_edit", &out, msg, json)
        }
        KwAction::Rm(args) => {
            let out = ws.execute(Command::RemoveKeyword {
                at,
                index: args.index,
            })?;
            let msg = format!("Removed keyword #{}", args.index);
            print_change("kw_rm", &out, msg, json)
        }
        KwAction::Up(args) => {
            let out = ws.execute(Command::MoveKeywordUp {
                at,
                index: args.index,
            })?;
            let msg = format!("Keyword #{} is now #{}", args.index, outcome_index(&out));
            print_change("kw_up", &out, msg, json)
        }
        KwAction::Down(args) => {
            let out = ws.execute(Command::MoveKeywordDown {
                at,
                index: args.index,
            })?;
            let msg = format!("Keyword #{} is now #{}", args.index, outcome_index(&out));
            print_change("kw_down", &out, msg, json)
        }
    }
}

fn apply_meta(draft: &mut KeywordDraft, meta: KwMetaArgs) -> Result<(), Box<dyn Error>> {
    if let Some(s) = meta.summary {
        draft.summary = s;
    }
    if let Some(g) = meta.group {
        draft.group = g;
    }
    if let Some(d) = meta.desc {
        draft.desc = d;
        draft.desc_rich = None;
    }
    if let Some(raw) = meta.desc_rich {
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| format!("--desc-rich is not valid JSON: {}", e))?;
        let runs = match value.as_array() {
            Some(items) => parse_runs(items),
            None => return Err("--desc-rich must be a JSON array of runs".into()),
        };
        draft.desc_rich = Some(runs);
    }
    Ok(())
}

fn outcome_index(out: &Outcome) -> usize {
    match out {
        Outcome::Index(i) => *i,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Params, delimiter, copy
// ---------------------------------------------------------------------------

fn cmd_param(
    ws: &mut Workspace,
    flags: &PathFlags,
    action: Option<ParamAction>,
    json: bool,
) -> CmdResult {
    let at = target(ws, flags)?;
    match action.unwrap_or(ParamAction::List) {
        ParamAction::List => {
            let category = ws.category(&at)?;
            let params: Vec<ParamJson> = category
                .params
                .iter()
                .map(|(name, value)| ParamJson {
                    name: name.clone(),
                    value: value.clone(),
                })
                .collect();
            if json {
                return print_json(&params);
            }
            if params.is_empty() {
                println!("(no params)");
            }
            for p in &params {
                println!("{} = {}", p.name, p.value);
            }
            Ok(())
        }
        ParamAction::Set(args) => {
            let out = ws.execute(Command::SetParam {
                at,
                name: args.name,
                value: args.value.clone(),
            })?;
            let msg = format!("{} = {}", outcome_name(&out), args.value);
            print_change("param_set", &out, msg, json)
        }
        ParamAction::Rm(args) => {
            let out = ws.execute(Command::RemoveParam {
                at,
                name: args.name.clone(),
            })?;
            let msg = if out == Outcome::Unchanged {
                format!("No param named {}", args.name)
            } else {
                format!("Removed param {}", args.name)
            };
            print_change("param_rm", &out, msg, json)
        }
    }
}

fn cmd_delimiter(
    ws: &mut Workspace,
    flags: &PathFlags,
    args: DelimiterArgs,
    json: bool,
) -> CmdResult {
    let vendor = target(ws, flags)?.vendor;
    let Some(value) = args.value else {
        let current = ws.delimiter(&vendor).to_string();
        if json {
            return print_json(&serde_json::json!({ "vendor": vendor, "delimiter": current }));
        }
        println!("{}", show_delimiter(&current));
        return Ok(());
    };

    if value.is_empty() && !args.allow_empty {
        return Err(
            "an empty delimiter joins parts with nothing in between; pass --allow-empty to confirm"
                .into(),
        );
    }
    let out = ws.execute(Command::SetDelimiter {
        vendor: vendor.clone(),
        delimiter: value.clone(),
    })?;
    let msg = format!("{} delimiter set to {}", vendor, show_delimiter(&value));
    print_change("delimiter", &out, msg, json)
}

fn cmd_copy(ws: &mut Workspace, flags: &PathFlags, args: CopyArgs) -> CmdResult {
    let at = target(ws, flags)?;
    let mode = if args.raw {
        CopyMode::WithoutParams
    } else {
        CopyMode::Rendered
    };
    let text = ws.copy_text(&at, args.index, mode)?;
    println!("{}", text);
    Ok(())
}

fn cmd_placeholders(
    ws: &mut Workspace,
    flags: &PathFlags,
    args: IndexArg,
    json: bool,
) -> CmdResult {
    let at = target(ws, flags)?;
    let found = ws.inspect_keyword(&at, args.index)?;
    if json {
        let items: Vec<ParamJson> = found
            .into_iter()
            .map(|p| ParamJson {
                name: p.name,
                value: p.value,
            })
            .collect();
        return print_json(&items);
    }
    if found.is_empty() {
        println!("(no placeholders)");
    }
    for p in &found {
        println!("{{{}}} = {}", p.name, p.value);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Export / import
// ---------------------------------------------------------------------------

fn cmd_export(ws: &Workspace, args: FileArg, json: bool) -> CmdResult {
    let path = PathBuf::from(&args.file);
    ws.export_package(&path)?;
    if json {
        return print_json(&serde_json::json!({ "exported": path.display().to_string() }));
    }
    println!("Exported to {}", path.display());
    Ok(())
}

fn cmd_import(ws: &mut Workspace, args: FileArg, json: bool) -> CmdResult {
    let text = fs::read_to_string(&args.file)
        .map_err(|e| format!("could not read {}: {}", args.file, e))?;
    let value: serde_json::Value = serde_json::from_str(&text).map_err(SchemaError::Parse)?;
    ws.import_package(value)?;

    let vendors = vendors_to_json(ws.catalog(), ws.config());
    if json {
        return print_json(&vendors);
    }
    println!("Imported {}", args.file);
    for v in &vendors {
        println!(
            "  {}: {} issue(s), {} keyword(s)",
            v.name,
            v.issues.len(),
            v.keywords
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Recovery log
// ---------------------------------------------------------------------------

fn cmd_recovery(dir: &Path, args: RecoveryArgs, json: bool) -> CmdResult {
    if args.prune {
        let removed = recovery::prune_recovery(dir, None, args.all)?;
        if json {
            return print_json(&serde_json::json!({ "removed": removed }));
        }
        let noun = if removed == 1 { "entry" } else { "entries" };
        println!("Removed {} recovery {}", removed, noun);
        return Ok(());
    }

    let entries = recovery::read_recovery_entries(dir, Some(args.limit.unwrap_or(10)));
    if json {
        let items: Vec<serde_json::Value> = entries.iter().map(|e| e.to_json()).collect();
        return print_json(&items);
    }
    if entries.is_empty() {
        println!("No recovery entries.");
        return Ok(());
    }
    for entry in &entries {
        print!("{}", entry);
    }
    Ok(())
}
