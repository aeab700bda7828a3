//! A minimal typesetter: characters, interword glue, math and paragraphs
//!
//! Characters are set in the current font and collected into a paragraph.
//! `\par` packs the paragraph at its natural width and ships it to the backend;
//!     there is no line breaking and no page building.
//! A display formula ends the current paragraph and is shipped as its own list.

use crate::backend::Backend;
use boxworks::node::{self, Horizontal, VList, Vertical};
use boxworks::pack::{hpack, vpack};
use common::{Glue, GlueComponent, Scaled};
use font::{dimen, Font, FontId, FontRepo};
use std::io::Write;
use texweave::command;
use texweave::error;
use texweave::group::Address;
use texweave::prelude as txl;
use texweave::token::{Token, Value};
use texweave::traits::*;
use texweave::vm;

/// Component holding the list being built and the backend lists are shipped to.
pub struct Component {
    vertical: Vec<Vertical>,
    paragraph: Option<Vec<Horizontal>>,
    space_factor: i32,
    backend: Option<Box<dyn Backend>>,
    shipped: Vec<VList>,
    num_shipped: usize,
}

impl Default for Component {
    fn default() -> Self {
        Component {
            vertical: vec![],
            paragraph: None,
            space_factor: 1000,
            backend: None,
            shipped: vec![],
            num_shipped: 0,
        }
    }
}

impl Component {
    /// Sets the backend that finished lists are shipped to.
    ///
    /// Without a backend, shipped lists are retained and can be read using [Component::shipped].
    pub fn set_backend(&mut self, backend: Box<dyn Backend>) {
        self.backend = Some(backend);
    }

    /// Lists shipped while no backend was set.
    pub fn shipped(&self) -> &[VList] {
        &self.shipped
    }

    /// Total number of lists shipped.
    pub fn num_shipped(&self) -> usize {
        self.num_shipped
    }

    pub fn space_factor(&self) -> i32 {
        self.space_factor
    }

    fn paragraph(&mut self) -> &mut Vec<Horizontal> {
        self.paragraph.get_or_insert_with(Vec::new)
    }

    /// Moves the current paragraph onto the vertical list and returns the vertical list, if non-empty.
    fn end_paragraph(&mut self) -> Option<VList> {
        if let Some(paragraph) = self.paragraph.take() {
            if !paragraph.is_empty() {
                self.vertical.push(Vertical::HList(hpack(paragraph)));
            }
        }
        self.space_factor = 1000;
        if self.vertical.is_empty() {
            return None;
        }
        Some(vpack(std::mem::take(&mut self.vertical)))
    }

    fn ship(&mut self, fonts: &FontRepo, list: VList) -> std::io::Result<()> {
        self.num_shipped += 1;
        log::debug!(
            "shipping list {} ({} nodes, {} wide)",
            self.num_shipped,
            list.list.len(),
            list.width
        );
        match &mut self.backend {
            None => {
                self.shipped.push(list);
                Ok(())
            }
            Some(backend) => backend.ship(&list, &|id| fonts.get(FontId(id)).name().to_string()),
        }
    }
}

/// States that can be typeset into.
pub trait TypesetState: HasComponent<Component> + HasComponent<texweave_math::Component> {}

impl<S: HasComponent<Component> + HasComponent<texweave_math::Component>> TypesetState for S {}

fn typesetter<S: TypesetState>(input: &mut vm::ExecutionInput<S>) -> &mut Component {
    HasComponent::<Component>::component_mut(input.state_mut())
}

fn math<S: TypesetState>(input: &mut vm::ExecutionInput<S>) -> &mut texweave_math::Component {
    HasComponent::<texweave_math::Component>::component_mut(input.state_mut())
}

/// Handler for character tokens outside of math mode.
pub fn character_handler<S: TypesetState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    match token.value() {
        Value::Letter(c) | Value::Other(c) => add_character(c, input),
        Value::Space(_) => {
            add_space(input);
            Ok(())
        }
        Value::MathShift(_) => math_shift(token, input),
        Value::Superscript(_) | Value::Subscript(_) => input.vm().error(
            error::SimpleTokenError::new(input.vm(), token, "missing $ inserted")
                .with_category(error::Category::Scope)
                .with_note("superscripts and subscripts are only allowed in math mode; the character is ignored"),
        ),
        Value::AlignmentTab(_) => input.vm().error(
            error::SimpleTokenError::new(input.vm(), token, "misplaced alignment tab character")
                .with_category(error::Category::Syntax)
                .with_note("alignments are not supported; the character is ignored"),
        ),
        Value::Parameter(_) => input.vm().error(
            error::SimpleTokenError::new(
                input.vm(),
                token,
                "you can't use a macro parameter character in horizontal mode",
            )
            .with_category(error::Category::Syntax)
            .with_note("the character is ignored"),
        ),
        Value::BeginGroup(_) | Value::EndGroup(_) | Value::CommandRef(_) => Ok(()),
    }
}

/// Handler for math characters, like those defined by `\mathchardef`, outside of math mode.
pub fn math_character_handler<S: TypesetState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    input.vm().error(
        error::SimpleTokenError::new(input.vm(), token, "missing $ inserted")
            .with_category(error::Category::Scope)
            .with_note("math characters may only appear in math mode; the character is ignored"),
    )
}

/// TeX.2021.1034 without ligatures and kerns.
fn add_character<S: TypesetState>(c: char, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    let vm = input.vm();
    let font_id = vm.chain().font(Address::CurrentFont);
    let font = vm.fonts.get(font_id).clone();
    let sf_code = vm.chain().integer(Address::SfCode(c));
    let Some(metrics) = font.glyph(c) else {
        // TeX.2021.581
        let mut log_file = vm.log_file.borrow_mut();
        _ = writeln!(
            log_file,
            "Missing character: There is no {c} in font {}!",
            font.name()
        );
        return Ok(());
    };
    let component = typesetter(input);
    component.paragraph().push(Horizontal::Char(node::Char {
        char: c,
        font: font_id.0,
        width: metrics.width,
        height: metrics.height,
        depth: metrics.depth,
    }));
    if sf_code != 0 {
        component.space_factor = if sf_code > 1000 && component.space_factor < 1000 {
            1000
        } else {
            sf_code
        };
    }
    Ok(())
}

/// Appends interword glue based on the current font and space factor.
///
/// Spaces outside of a paragraph are ignored.
///
/// TeX.2021.1041 to TeX.2021.1044.
fn add_space<S: TypesetState>(input: &mut vm::ExecutionInput<S>) {
    if typesetter(input).paragraph.is_none() {
        return;
    }
    let vm = input.vm();
    let font = vm.fonts.get(vm.chain().font(Address::CurrentFont)).clone();
    let param = |n| font.dimen(n).unwrap_or(Scaled::ZERO);
    let component = typesetter(input);
    let sf = component.space_factor;
    let mut width = param(dimen::SPACE);
    let mut stretch = param(dimen::SPACE_STRETCH);
    let mut shrink = param(dimen::SPACE_SHRINK);
    if sf != 1000 {
        if sf >= 2000 {
            width += param(dimen::EXTRA_SPACE);
        }
        stretch = stretch.xn_over_d(sf, 1000).map(|(q, _)| q).unwrap_or(stretch);
        shrink = shrink.xn_over_d(1000, sf).map(|(q, _)| q).unwrap_or(shrink);
    }
    component.paragraph().push(Horizontal::Glue(node::Glue {
        kind: node::GlueKind::Normal,
        glue: Glue {
            width: GlueComponent::finite(width),
            stretch: GlueComponent::finite(stretch),
            shrink: GlueComponent::finite(shrink),
        },
    }));
}

fn math_shift<S: TypesetState>(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    let formula = match texweave_math::math_shift(token, input) {
        Ok(formula) => formula,
        Err(err) => {
            return Err(error::Error::new_propagated(
                input.vm(),
                error::OperationKind::MathMode,
                token,
                err,
            ))
        }
    };
    match formula {
        texweave_math::Formula::Inline(nodes) => {
            let component = typesetter(input);
            component.paragraph().extend(nodes);
            component.space_factor = 1000;
        }
        texweave_math::Formula::Display(display) => {
            if let Some(list) = typesetter(input).end_paragraph() {
                ship(token, input, list)?;
            }
            ship(token, input, vpack(vec![Vertical::HList(display)]))?;
        }
    }
    Ok(())
}

fn ship<S: TypesetState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
    list: VList,
) -> txl::Result<()> {
    let parts = input.vm_parts();
    let component = HasComponent::<Component>::component_mut(parts.state);
    if let Err(err) = component.ship(parts.fonts, list) {
        return Err(error::SimpleTokenError::new(
            input.vm(),
            token,
            format!("failed to ship a list to the backend: {err}"),
        )
        .with_category(error::Category::Resource)
        .into());
    }
    Ok(())
}

/// Ships the material that remains when the input ends.
pub fn finish<S: TypesetState>(vm: &mut vm::VM<S>) -> txl::Result<()> {
    let component = HasComponent::<Component>::component_mut(&mut vm.state);
    let Some(list) = component.end_paragraph() else {
        return Ok(());
    };
    if let Err(err) = component.ship(&vm.fonts, list) {
        return Err(error::SimpleFailedPreconditionError::new(format!(
            "failed to ship a list to the backend: {err}"
        ))
        .with_category(error::Category::Resource)
        .into());
    }
    Ok(())
}

/// Get the `\par` command.
pub fn get_par<S: TypesetState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(par_primitive_fn).with_doc("End the current paragraph")
}

fn par_primitive_fn<S: TypesetState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    if math(input).in_math_mode() {
        return Err(error::SimpleTokenError::new(input.vm(), token, "missing $ inserted")
            .with_category(error::Category::Scope)
            .with_note("a paragraph cannot end inside a math formula")
            .into());
    }
    match typesetter(input).end_paragraph() {
        None => Ok(()),
        Some(list) => ship(token, input, list),
    }
}

/// Get the `\kern` command.
pub fn get_kern<S: TypesetState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(kern_primitive_fn).with_doc("Append a kern")
}

fn kern_primitive_fn<S: TypesetState>(
    _: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let width = Scaled::parse(input)?;
    let kern = node::Kern {
        kind: node::KernKind::Explicit,
        width,
    };
    if math(input).append_node(Horizontal::Kern(kern)) {
        return Ok(());
    }
    let component = typesetter(input);
    match &mut component.paragraph {
        Some(paragraph) => paragraph.push(Horizontal::Kern(kern)),
        None => component.vertical.push(Vertical::Kern(kern)),
    }
    Ok(())
}

/// Get the `\penalty` command.
pub fn get_penalty<S: TypesetState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(penalty_primitive_fn).with_doc("Append a penalty")
}

fn penalty_primitive_fn<S: TypesetState>(
    _: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let value = i32::parse(input)?;
    let penalty = node::Penalty { value };
    if math(input).append_node(Horizontal::Penalty(penalty)) {
        return Ok(());
    }
    let component = typesetter(input);
    match &mut component.paragraph {
        Some(paragraph) => paragraph.push(Horizontal::Penalty(penalty)),
        None => component.vertical.push(Vertical::Penalty(penalty)),
    }
    Ok(())
}

/// Get the `\hskip` command.
pub fn get_hskip<S: TypesetState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(hskip_primitive_fn)
        .with_doc("Append horizontal glue, starting a paragraph if needed")
}

fn hskip_primitive_fn<S: TypesetState>(
    _: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let glue = Glue::parse(input)?;
    let node = Horizontal::Glue(node::Glue {
        kind: node::GlueKind::Normal,
        glue,
    });
    if math(input).in_math_mode() {
        math(input).append_node(node);
        return Ok(());
    }
    typesetter(input).paragraph().push(node);
    Ok(())
}
