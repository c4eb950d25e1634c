//! ezbattlemap: command-line manager for the battle map asset library.

use std::path::PathBuf;
use std::process;

use ezbattlemap_core::library::parse_tags;
use ezbattlemap_core::{AssetLibrary, AssetMetadata, GalleryFilter, LibraryType};

const USAGE: &str = "\
Usage: ezbattlemap <command> [args]

Commands:
  import <maps|tokens> <file>...       Import image files
  list [maps|tokens] [--category <c>] [--search <q>]
  search <query>                       Search names, categories, tags and notes
  show <id>                            Print an asset's metadata
  edit <id> [--name <n>] [--category <c>] [--tags <a,b>] [--notes <n>] [--cell-size <px>]
  delete <id>                          Remove an asset and its files
  thumbnail <id>                       Regenerate an asset's thumbnail

The library lives in $EZBATTLEMAP_HOME, or ~/.ezbattlemap if unset.";

#[derive(Debug, PartialEq)]
enum Command {
    Import {
        library_type: LibraryType,
        files: Vec<PathBuf>,
    },
    List {
        library_type: Option<LibraryType>,
        category: Option<String>,
        query: Option<String>,
    },
    Search {
        query: String,
    },
    Show {
        id: String,
    },
    Edit {
        id: String,
        edits: Edits,
    },
    Delete {
        id: String,
    },
    Thumbnail {
        id: String,
    },
    Help,
}

#[derive(Debug, Default, PartialEq)]
struct Edits {
    name: Option<String>,
    category: Option<String>,
    tags: Option<String>,
    notes: Option<String>,
    cell_size: Option<u32>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();

    let cmd = match parse_args(&arg_refs) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ezbattlemap: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(cmd) {
        eprintln!("ezbattlemap error: {}", e);
        process::exit(1);
    }
}

fn run(cmd: Command) -> Result<(), String> {
    if cmd == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    log::debug!("Running {:?}", cmd);
    let mut library = AssetLibrary::open_default().map_err(|e| e.to_string())?;

    match cmd {
        Command::Import {
            library_type,
            files,
        } => {
            let report = library.import_files(&files, library_type);
            for metadata in &report.imported {
                println!("imported {}", metadata.id());
            }
            for (path, err) in &report.failed {
                eprintln!("failed {}: {}", path.display(), err);
            }
            println!(
                "{} of {} files imported into {}",
                report.imported.len(),
                files.len(),
                library_type
            );
            if report.is_complete() {
                Ok(())
            } else {
                Err(format!("{} files failed to import", report.failed.len()))
            }
        }
        Command::List {
            library_type,
            category,
            query,
        } => {
            let types = match library_type {
                Some(t) => vec![t],
                None => vec![LibraryType::Map, LibraryType::Token],
            };
            for library_type in types {
                let mut filter = GalleryFilter::new(library_type);
                if let Some(category) = &category {
                    filter = filter.with_category(category.as_str());
                }
                if let Some(query) = &query {
                    filter = filter.with_query(query.as_str());
                }
                let ids = library.gallery(&filter);
                println!("{} ({})", library_type, ids.len());
                for id in ids {
                    if let Some(metadata) = library.metadata(&id) {
                        println!("  {}", summary_line(metadata));
                    }
                }
            }
            Ok(())
        }
        Command::Search { query } => {
            for id in library.search(&query) {
                if let Some(metadata) = library.metadata(&id) {
                    println!("{}", summary_line(metadata));
                }
            }
            Ok(())
        }
        Command::Show { id } => {
            let metadata = library
                .metadata(&id)
                .ok_or_else(|| format!("Asset not found: {}", id))?;
            println!("{}", details(metadata));
            if let Ok((width, height)) = library.image_dimensions(&id) {
                println!("size:          {}x{}", width, height);
            }
            Ok(())
        }
        Command::Edit { id, edits } => {
            let mut metadata = library
                .metadata(&id)
                .cloned()
                .ok_or_else(|| format!("Asset not found: {}", id))?;
            apply_edits(&mut metadata, &edits);
            library
                .update_metadata(&id, metadata)
                .map_err(|e| e.to_string())?;
            println!("updated {}", id);
            Ok(())
        }
        Command::Delete { id } => {
            if !library.contains(&id) {
                return Err(format!("Asset not found: {}", id));
            }
            library.delete_image(&id).map_err(|e| e.to_string())?;
            println!("deleted {}", id);
            Ok(())
        }
        Command::Thumbnail { id } => {
            library
                .regenerate_thumbnail(&id)
                .map_err(|e| e.to_string())?;
            println!("regenerated thumbnail for {}", id);
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

fn apply_edits(metadata: &mut AssetMetadata, edits: &Edits) {
    if let Some(name) = &edits.name {
        metadata.set_display_name(name.as_str());
    }
    if let Some(category) = &edits.category {
        metadata.set_category(category.as_str());
    }
    if let Some(tags) = &edits.tags {
        metadata.set_tags(parse_tags(tags));
    }
    if let Some(notes) = &edits.notes {
        metadata.set_notes(notes.as_str());
    }
    if let Some(cell_size) = edits.cell_size {
        metadata.set_cell_size(cell_size);
    }
}

fn summary_line(metadata: &AssetMetadata) -> String {
    format!(
        "{:<24} {:<20} [{}]",
        metadata.id(),
        metadata.display_name(),
        metadata.category()
    )
}

fn details(metadata: &AssetMetadata) -> String {
    let tags: Vec<&str> = metadata.tags().iter().map(String::as_str).collect();
    [
        format!("id:            {}", metadata.id()),
        format!("name:          {}", metadata.display_name()),
        format!("type:          {}", metadata.library_type()),
        format!("category:      {}", metadata.category()),
        format!("tags:          {}", tags.join(", ")),
        format!("notes:         {}", metadata.notes()),
        format!("file:          {}", metadata.file_name()),
        format!("cell size:     {}", metadata.cell_size()),
        format!("added:         {}", metadata.date_added().to_rfc3339()),
        format!("last modified: {}", metadata.last_modified().to_rfc3339()),
    ]
    .join("\n")
}

fn parse_args(args: &[&str]) -> Result<Command, String> {
    if args.is_empty() {
        return Err("No command specified. Run 'ezbattlemap help' for usage.".into());
    }

    match args[0] {
        "help" | "--help" | "-h" => Ok(Command::Help),
        "import" => {
            if args.len() < 3 {
                return Err("Usage: ezbattlemap import <maps|tokens> <file>...".into());
            }
            Ok(Command::Import {
                library_type: args[1].parse()?,
                files: args[2..].iter().map(PathBuf::from).collect(),
            })
        }
        "list" => {
            let library_type = match args.get(1) {
                Some(a) if !a.starts_with("--") => Some(a.parse()?),
                _ => None,
            };
            Ok(Command::List {
                library_type,
                category: find_flag(args, "--category"),
                query: find_flag(args, "--search"),
            })
        }
        "search" => {
            if args.len() < 2 {
                return Err("Usage: ezbattlemap search <query>".into());
            }
            Ok(Command::Search {
                query: args[1..].join(" "),
            })
        }
        "show" => Ok(Command::Show {
            id: required_id(args, "show <id>")?,
        }),
        "edit" => {
            let id = required_id(args, "edit <id> [--name <n>] ...")?;
            let cell_size = match find_flag(args, "--cell-size") {
                Some(v) => Some(
                    v.parse::<u32>()
                        .ok()
                        .filter(|size| *size > 0)
                        .ok_or_else(|| format!("Invalid cell size: '{}'", v))?,
                ),
                None => None,
            };
            let edits = Edits {
                name: find_flag(args, "--name"),
                category: find_flag(args, "--category"),
                tags: find_flag(args, "--tags"),
                notes: find_flag(args, "--notes"),
                cell_size,
            };
            if edits == Edits::default() {
                return Err("Nothing to edit. Pass at least one --flag.".into());
            }
            Ok(Command::Edit { id, edits })
        }
        "delete" => Ok(Command::Delete {
            id: required_id(args, "delete <id>")?,
        }),
        "thumbnail" => Ok(Command::Thumbnail {
            id: required_id(args, "thumbnail <id>")?,
        }),
        _ => Err(format!(
            "Unknown command: '{}'. Run 'ezbattlemap help' for usage.",
            args[0]
        )),
    }
}

fn required_id(args: &[&str], usage: &str) -> Result<String, String> {
    match args.get(1) {
        Some(id) if !id.starts_with("--") => Ok(id.to_string()),
        _ => Err(format!("Usage: ezbattlemap {}", usage)),
    }
}

fn find_flag(args: &[&str], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| *a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import() {
        let cmd = parse_args(&["import", "tokens", "orc.png", "dir/wolf.jpg"]).unwrap();
        assert_eq!(
            cmd,
            Command::Import {
                library_type: LibraryType::Token,
                files: vec![PathBuf::from("orc.png"), PathBuf::from("dir/wolf.jpg")],
            }
        );
        assert!(parse_args(&["import", "sounds", "a.wav"]).is_err());
        assert!(parse_args(&["import", "maps"]).is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_args(&["list"]).unwrap(),
            Command::List {
                library_type: None,
                category: None,
                query: None
            }
        );
        assert_eq!(
            parse_args(&["list", "maps", "--category", "Dungeons", "--search", "crypt"]).unwrap(),
            Command::List {
                library_type: Some(LibraryType::Map),
                category: Some("Dungeons".into()),
                query: Some("crypt".into()),
            }
        );
        assert_eq!(
            parse_args(&["list", "--search", "orc"]).unwrap(),
            Command::List {
                library_type: None,
                category: None,
                query: Some("orc".into()),
            }
        );
    }

    #[test]
    fn test_parse_edit() {
        let cmd = parse_args(&["edit", "orc", "--tags", "Orc, Boss", "--cell-size", "70"]).unwrap();
        assert_eq!(
            cmd,
            Command::Edit {
                id: "orc".into(),
                edits: Edits {
                    tags: Some("Orc, Boss".into()),
                    cell_size: Some(70),
                    ..Edits::default()
                },
            }
        );
        assert!(parse_args(&["edit", "orc"]).is_err());
        assert!(parse_args(&["edit", "orc", "--cell-size", "0"]).is_err());
        assert!(parse_args(&["edit", "--name", "x"]).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&["frobnicate"]).is_err());
        assert!(parse_args(&["show"]).is_err());
        assert_eq!(parse_args(&["help"]).unwrap(), Command::Help);
        assert_eq!(
            parse_args(&["search", "red", "dragon"]).unwrap(),
            Command::Search {
                query: "red dragon".into()
            }
        );
    }

    #[test]
    fn test_apply_edits() {
        let mut metadata = AssetMetadata::new("orc", "orc.png", LibraryType::Token, 100);
        let edits = Edits {
            name: Some("Orc Chief".into()),
            tags: Some("Orc, BOSS ,".into()),
            cell_size: Some(50),
            ..Edits::default()
        };
        apply_edits(&mut metadata, &edits);

        assert_eq!(metadata.display_name(), "Orc Chief");
        assert_eq!(metadata.category(), "Uncategorized");
        assert_eq!(metadata.cell_size(), 50);
        let tags: Vec<&str> = metadata.tags().iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["boss", "orc"]);
    }
}
