//! The fragment merge algorithm.
//!
//! Per type name, member signatures contributed by each platform are
//! unioned. A member shared by two or more platforms must agree
//! structurally on its signature and implicit context kind; a member
//! declared by exactly one platform is accepted as a platform-specific
//! extension and marked with that platform alone. Output order is
//! fully deterministic (types by qualified name, members by identity),
//! so linking is insensitive to fragment order.

use std::collections::BTreeMap;

use crossbind_api::{
    ContextKind, EnumValue, Fragment, LinkedApi, LinkedMember, LinkedType, Member, MemberId,
    Method, Platform, PlatformSet, TypeDef, TypeKind,
};
use tracing::debug;

use crate::error::{LinkErrors, ValidationError};

/// Merge per-platform fragments into one validated API.
///
/// All validation failures across the whole input are collected; a
/// partial [`LinkedApi`] is never produced.
pub fn link(fragments: Vec<Fragment>) -> Result<LinkedApi, LinkErrors> {
    let mut all_platforms = PlatformSet::empty();
    for fragment in &fragments {
        all_platforms |= fragment.platform.into();
    }

    let mut accs: BTreeMap<String, TypeAcc> = BTreeMap::new();
    for fragment in &fragments {
        for def in fragment.types() {
            accs.entry(def.qualified_name.clone()).or_default().add(def, fragment.platform);
        }
    }

    let mut errors = Vec::new();
    let mut types = Vec::new();
    for (name, acc) in accs {
        if let Some(linked) = acc.resolve(&name, &mut errors) {
            debug!(type_name = %name, platforms = %linked.platforms.names(), "merged type");
            types.push(linked);
        }
    }

    if errors.is_empty() {
        Ok(LinkedApi { platforms: all_platforms, types })
    } else {
        Err(LinkErrors::new(errors))
    }
}

/// Precedence rank; lower wins when one platform's declaration must
/// represent the merged member (parameter names, enum value order).
fn rank(platform: Platform) -> usize {
    Platform::PRECEDENCE.iter().position(|p| *p == platform).unwrap_or(usize::MAX)
}

/// One distinct signature contributed for a member identity.
struct MemberAcc {
    id: MemberId,
    member: Member,
    platforms: PlatformSet,
    /// The highest-precedence contributing platform, whose declaration
    /// the merged member text follows.
    representative: Platform,
}

/// Everything contributed for one qualified type name.
#[derive(Default)]
struct TypeAcc {
    platforms: PlatformSet,
    kinds: Vec<(TypeKind, PlatformSet)>,
    members: Vec<MemberAcc>,
    enums: Vec<(Platform, Vec<EnumValue>)>,
}

impl TypeAcc {
    fn add(&mut self, def: &TypeDef, platform: Platform) {
        self.platforms |= platform.into();

        match self.kinds.iter_mut().find(|(kind, _)| *kind == def.kind) {
            Some((_, platforms)) => *platforms |= platform.into(),
            None => self.kinds.push((def.kind, platform.into())),
        }

        for member in def.members() {
            self.add_member(member, platform);
        }
        if def.kind == TypeKind::Enum {
            self.enums.push((platform, def.enum_values().to_vec()));
        }
    }

    fn add_member(&mut self, member: &Member, platform: Platform) {
        let id = member.id();
        for acc in &mut self.members {
            if acc.id == id
                && signatures_match(&acc.member, member)
                && effective_context(&acc.member) == effective_context(member)
            {
                acc.platforms |= platform.into();
                merge_method_flags(&mut acc.member, member);
                if rank(platform) < rank(acc.representative) {
                    replace_representative(&mut acc.member, member);
                    acc.representative = platform;
                }
                return;
            }
        }
        self.members.push(MemberAcc {
            id,
            member: member.clone(),
            platforms: platform.into(),
            representative: platform,
        });
    }

    fn resolve(mut self, name: &str, errors: &mut Vec<ValidationError>) -> Option<LinkedType> {
        // Canonical order, so conflicts read the same regardless of
        // fragment input order.
        self.kinds.sort_by_key(|(_, platforms)| platforms.bits());
        self.members.sort_by(|a, b| {
            a.id.cmp(&b.id).then(a.platforms.bits().cmp(&b.platforms.bits()))
        });

        if self.kinds.len() > 1 {
            let (first_kind, first_platforms) = self.kinds[0];
            for (kind, platforms) in &self.kinds[1..] {
                errors.push(ValidationError::KindMismatch {
                    type_name: name.to_string(),
                    first_kind: first_kind.element_name(),
                    first_platforms: first_platforms.names(),
                    second_kind: kind.element_name(),
                    second_platforms: platforms.names(),
                });
            }
            return None;
        }
        let kind = self.kinds.first().map_or(TypeKind::Class, |(kind, _)| *kind);

        let mut members = Vec::new();
        let mut reported: Vec<&MemberId> = Vec::new();
        for (index, acc) in self.members.iter().enumerate() {
            if reported.contains(&&acc.id) {
                continue;
            }
            let conflicts: Vec<&MemberAcc> =
                self.members[index + 1..].iter().filter(|other| other.id == acc.id).collect();
            if conflicts.is_empty() {
                members.push(LinkedMember { member: acc.member.clone(), platforms: acc.platforms });
            } else {
                for other in conflicts {
                    errors.push(member_conflict(name, acc, other));
                }
                reported.push(&acc.id);
            }
        }
        members.sort_by(|a, b| a.member.id().cmp(&b.member.id()));

        let enum_values = resolve_enum_values(name, &self.enums, errors);

        Some(LinkedType {
            qualified_name: name.to_string(),
            kind,
            platforms: self.platforms,
            members,
            enum_values,
        })
    }
}

/// True when two contributions describe the same signature, context
/// aside.
fn signatures_match(left: &Member, right: &Member) -> bool {
    match (left, right) {
        (Member::Method(a), Member::Method(b)) => {
            let a_params = a.effective_parameters();
            let b_params = b.effective_parameters();
            a.returns == b.returns
                && a_params.len() == b_params.len()
                && a_params
                    .iter()
                    .zip(b_params)
                    .all(|(ap, bp)| ap.param_type == bp.param_type)
        },
        (Member::Property(a), Member::Property(b)) => {
            a.value_type == b.value_type && a.can_read == b.can_read && a.can_write == b.can_write
        },
        (Member::Event(a), Member::Event(b)) => a.arg_type == b.arg_type,
        _ => false,
    }
}

/// The context kind that governs dispatch: a leading implicit-context
/// parameter wins over the method-level annotation.
fn effective_context(member: &Member) -> ContextKind {
    match member {
        Member::Method(method) => match method.parameters.first() {
            Some(first) if first.param_type.context != ContextKind::None => {
                first.param_type.context
            },
            _ => method.context,
        },
        Member::Property(_) | Member::Event(_) => ContextKind::None,
    }
}

/// A method merged from several platforms is async if any contributor
/// is; clients await the call either way.
fn merge_method_flags(merged: &mut Member, contribution: &Member) {
    if let (Member::Method(m), Member::Method(c)) = (merged, contribution) {
        m.is_async = m.is_async || c.is_async;
    }
}

/// Replace the stored declaration text (parameter names) with the
/// higher-precedence platform's, keeping already-merged flags.
fn replace_representative(merged: &mut Member, contribution: &Member) {
    match (merged, contribution) {
        (Member::Method(m), Member::Method(c)) => {
            let is_async = m.is_async;
            *m = Method { is_async, ..c.clone() };
        },
        (merged, contribution) => *merged = contribution.clone(),
    }
}

fn member_conflict(type_name: &str, left: &MemberAcc, right: &MemberAcc) -> ValidationError {
    if signatures_match(&left.member, &right.member) {
        return ValidationError::ContextMismatch {
            type_name: type_name.to_string(),
            member: left.id.clone(),
            left_platforms: left.platforms.names(),
            right_platforms: right.platforms.names(),
        };
    }
    ValidationError::SignatureMismatch {
        type_name: type_name.to_string(),
        member: left.id.clone(),
        left_platforms: left.platforms.names(),
        right_platforms: right.platforms.names(),
        detail: signature_detail(&left.member, &right.member),
    }
}

fn signature_detail(left: &Member, right: &Member) -> String {
    match (left, right) {
        (Member::Method(a), Member::Method(b)) => {
            if a.returns != b.returns {
                return format!("return type `{}` vs `{}`", a.returns, b.returns);
            }
            let a_params = a.effective_parameters();
            let b_params = b.effective_parameters();
            for (index, (ap, bp)) in a_params.iter().zip(b_params).enumerate() {
                if ap.param_type != bp.param_type {
                    return format!(
                        "parameter {index} type `{}` vs `{}`",
                        ap.param_type, bp.param_type
                    );
                }
            }
            "parameter list mismatch".to_string()
        },
        (Member::Property(a), Member::Property(b)) => {
            if a.value_type != b.value_type {
                return format!("property type `{}` vs `{}`", a.value_type, b.value_type);
            }
            format!(
                "accessors read={}/write={} vs read={}/write={}",
                a.can_read, a.can_write, b.can_read, b.can_write
            )
        },
        (Member::Event(a), Member::Event(b)) => {
            format!("event argument type `{}` vs `{}`", a.arg_type, b.arg_type)
        },
        (a, b) => format!("declared as {} vs {}", a.kind_label(), b.kind_label()),
    }
}

/// Union enum values across declaring platforms. Symbol sets must
/// match exactly; a same-symbol different-integer declaration is a
/// hard error. Output order follows the highest-precedence declaring
/// platform.
fn resolve_enum_values(
    type_name: &str,
    decls: &[(Platform, Vec<EnumValue>)],
    errors: &mut Vec<ValidationError>,
) -> Vec<EnumValue> {
    if decls.is_empty() {
        return Vec::new();
    }

    let mut declaring = PlatformSet::empty();
    for (platform, _) in decls {
        declaring |= (*platform).into();
    }

    // symbol -> (value, declaring platforms) in first-seen order per
    // the representative platform below
    let mut by_symbol: BTreeMap<&str, Vec<(i64, PlatformSet)>> = BTreeMap::new();
    for (platform, values) in decls {
        for value in values {
            let entries = by_symbol.entry(value.symbol.as_str()).or_default();
            match entries.iter_mut().find(|(v, _)| *v == value.value) {
                Some((_, platforms)) => *platforms |= (*platform).into(),
                None => entries.push((value.value, (*platform).into())),
            }
        }
    }

    let mut failed = false;
    for (symbol, entries) in &mut by_symbol {
        entries.sort_by_key(|(_, platforms)| platforms.bits());
        let entries = &*entries;
        let mut seen = PlatformSet::empty();
        for (_, platforms) in entries {
            seen |= *platforms;
        }
        if seen != declaring {
            failed = true;
            errors.push(ValidationError::EnumSymbolMismatch {
                type_name: type_name.to_string(),
                symbol: (*symbol).to_string(),
                declaring: seen.names(),
                missing: declaring.difference(seen).names(),
            });
        }
        if entries.len() > 1 {
            failed = true;
            errors.push(ValidationError::EnumValueConflict {
                type_name: type_name.to_string(),
                symbol: (*symbol).to_string(),
                left_value: entries[0].0,
                left_platforms: entries[0].1.names(),
                right_value: entries[1].0,
                right_platforms: entries[1].1.names(),
            });
        }
    }
    if failed {
        return Vec::new();
    }

    // Value order follows the highest-precedence declaring platform.
    decls
        .iter()
        .min_by_key(|(platform, _)| rank(*platform))
        .map(|(_, values)| values.clone())
        .unwrap_or_default()
}
