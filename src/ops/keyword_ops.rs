use crate::model::catalog::Category;
use crate::model::keyword::{Keyword, KeywordDraft};
use crate::ops::template::{detect_placeholders, joined_template, keyword_parts};
use crate::ops::{NameKind, ValidationError, clean_name};

fn check_index(cat: &Category, index: usize) -> Result<(), ValidationError> {
    if index >= cat.keywords.len() {
        return Err(ValidationError::IndexOutOfRange {
            index,
            len: cat.keywords.len(),
        });
    }
    Ok(())
}

/// Register every placeholder of `template` as a param, defaulting to "".
/// Existing values are left alone. Returns the placeholders in order.
pub fn ensure_placeholder_params(cat: &mut Category, template: &str) -> Vec<String> {
    let names = detect_placeholders(template);
    for name in &names {
        if !cat.params.contains_key(name) {
            tracing::debug!(param = %name, "registering placeholder param");
            cat.params.insert(name.clone(), String::new());
        }
    }
    names
}

/// Append a keyword built from `draft`. Returns its index.
pub fn add_keyword(
    cat: &mut Category,
    draft: KeywordDraft,
    delimiter: &str,
) -> Result<usize, ValidationError> {
    let kw = draft.into_keyword().ok_or(ValidationError::EmptyParts)?;
    ensure_placeholder_params(cat, &joined_template(&kw, delimiter));
    cat.keywords.push(kw);
    Ok(cat.keywords.len() - 1)
}

/// Replace the keyword at `index`. A text keyword becomes a parts keyword.
pub fn edit_keyword(
    cat: &mut Category,
    index: usize,
    draft: KeywordDraft,
    delimiter: &str,
) -> Result<(), ValidationError> {
    check_index(cat, index)?;
    let kw = draft.into_keyword().ok_or(ValidationError::EmptyParts)?;
    ensure_placeholder_params(cat, &joined_template(&kw, delimiter));
    cat.keywords[index] = kw;
    Ok(())
}

pub fn remove_keyword(cat: &mut Category, index: usize) -> Result<Keyword, ValidationError> {
    check_index(cat, index)?;
    Ok(cat.keywords.remove(index))
}

/// Swap with the previous keyword. Returns the new index; the first stays put.
pub fn move_up(cat: &mut Category, index: usize) -> Result<usize, ValidationError> {
    check_index(cat, index)?;
    if index == 0 {
        return Ok(0);
    }
    cat.keywords.swap(index - 1, index);
    Ok(index - 1)
}

/// Swap with the next keyword. Returns the new index; the last stays put.
pub fn move_down(cat: &mut Category, index: usize) -> Result<usize, ValidationError> {
    check_index(cat, index)?;
    if index + 1 == cat.keywords.len() {
        return Ok(index);
    }
    cat.keywords.swap(index, index + 1);
    Ok(index + 1)
}

/// Insert or overwrite a param. The name is trimmed; the value is kept as given.
pub fn set_param(cat: &mut Category, name: &str, value: &str) -> Result<String, ValidationError> {
    let name = clean_name(name, NameKind::Param)?;
    cat.params.insert(name.clone(), value.to_string());
    Ok(name)
}

/// Remove a param. Returns false when it did not exist.
pub fn remove_param(cat: &mut Category, name: &str) -> bool {
    cat.params.shift_remove(name.trim()).is_some()
}

/// An editor draft pre-filled from an existing keyword.
pub fn draft_for(kw: &Keyword, delimiter: &str) -> KeywordDraft {
    KeywordDraft {
        parts: keyword_parts(kw, delimiter),
        summary: kw.summary.clone(),
        group: kw.group.clone(),
        desc: kw.desc.clone(),
        desc_rich: kw.desc_rich.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::keyword::KeywordBody;

    fn cat_with(texts: &[&str]) -> Category {
        Category {
            keywords: texts.iter().map(|t| Keyword::from_parts([*t])).collect(),
            ..Default::default()
        }
    }

    fn heads(cat: &Category) -> Vec<String> {
        cat.keywords
            .iter()
            .map(|k| joined_template(k, ";").into_owned())
            .collect()
    }

    #[test]
    fn add_cleans_parts() {
        let mut cat = Category::default();
        let idx = add_keyword(&mut cat, KeywordDraft::with_parts(["X", "", " Y "]), ";").unwrap();
        assert_eq!(idx, 0);
        assert_eq!(
            cat.keywords[0].body,
            KeywordBody::Parts(vec!["X".into(), "Y".into()])
        );
    }

    #[test]
    fn add_rejects_empty_parts() {
        let mut cat = Category::default();
        assert_eq!(
            add_keyword(&mut cat, KeywordDraft::with_parts(["  "]), ";"),
            Err(ValidationError::EmptyParts)
        );
        assert!(cat.keywords.is_empty());
    }

    #[test]
    fn add_registers_placeholders_lazily() {
        let mut cat = Category::default();
        cat.params.insert("PID".into(), "1234".into());
        add_keyword(
            &mut cat,
            KeywordDraft::with_parts(["pid={PID}", "{TAG} {PID}"]),
            ";",
        )
        .unwrap();
        assert_eq!(cat.params["PID"], "1234");
        assert_eq!(cat.params["TAG"], "");
        assert_eq!(cat.params.len(), 2);
    }

    #[test]
    fn edit_replaces_in_place() {
        let mut cat = cat_with(&["a", "b"]);
        edit_keyword(&mut cat, 1, KeywordDraft::with_parts(["c", "d"]), "|").unwrap();
        assert_eq!(heads(&cat), vec!["a", "c;d"]);
        assert!(matches!(
            edit_keyword(&mut cat, 5, KeywordDraft::with_parts(["x"]), ";"),
            Err(ValidationError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert_eq!(
            edit_keyword(&mut cat, 0, KeywordDraft::default(), ";"),
            Err(ValidationError::EmptyParts)
        );
        assert_eq!(heads(&cat), vec!["a", "c;d"]);
    }

    #[test]
    fn moves_are_noops_at_edges() {
        let mut cat = cat_with(&["a", "b", "c"]);
        assert_eq!(move_up(&mut cat, 0).unwrap(), 0);
        assert_eq!(move_down(&mut cat, 2).unwrap(), 2);
        assert_eq!(heads(&cat), vec!["a", "b", "c"]);

        assert_eq!(move_down(&mut cat, 0).unwrap(), 1);
        assert_eq!(heads(&cat), vec!["b", "a", "c"]);
        assert_eq!(move_up(&mut cat, 2).unwrap(), 1);
        assert_eq!(heads(&cat), vec!["b", "c", "a"]);
        assert!(move_up(&mut cat, 3).is_err());
    }

    #[test]
    fn remove_returns_keyword() {
        let mut cat = cat_with(&["a", "b"]);
        let kw = remove_keyword(&mut cat, 0).unwrap();
        assert_eq!(kw.body, KeywordBody::Parts(vec!["a".into()]));
        assert_eq!(heads(&cat), vec!["b"]);
        assert!(remove_keyword(&mut cat, 1).is_err());
    }

    #[test]
    fn params_set_and_remove() {
        let mut cat = Category::default();
        assert_eq!(set_param(&mut cat, " PID ", " 42 ").unwrap(), "PID");
        assert_eq!(cat.params["PID"], " 42 ");
        assert_eq!(
            set_param(&mut cat, "", "x"),
            Err(ValidationError::BlankName(NameKind::Param))
        );
        assert!(remove_param(&mut cat, "PID"));
        assert!(!remove_param(&mut cat, "PID"));
    }

    #[test]
    fn draft_splits_legacy_text() {
        let kw = Keyword::from_text("a ; b;c");
        let draft = draft_for(&kw, ";");
        assert_eq!(draft.parts, vec!["a", "b", "c"]);
        let draft = draft_for(&kw, "");
        assert_eq!(draft.parts, vec!["a ; b;c"]);
    }
}
