// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Interior nodes: [`Group`] and the state-scoping [`Separator`].

use crate::context::{
    scoped, Allocator, BoundingBoxQuery, CommandRecorder, EventHandler, PipelineCreator,
    Presenter, SceneRenderer, Stager,
};
use crate::error::SceneError;
use crate::node::{typed_node, Node, NodeKind};

/// An ordered list of children, visited in order with the same context.
///
/// State written by one child is visible to every later sibling and to
/// whatever follows the group.
#[derive(Debug, Default)]
pub struct Group {
    children: Vec<Box<dyn Node>>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn with(mut self, child: impl Node + 'static) -> Self {
        self.push(child);
        self
    }

    pub fn push(&mut self, child: impl Node + 'static) {
        self.children.push(Box::new(child));
    }

    pub fn push_boxed(&mut self, child: Box<dyn Node>) {
        self.children.push(child);
    }

    pub fn insert(&mut self, index: usize, child: Box<dyn Node>) {
        self.children.insert(index, child);
    }

    /// Removes and returns the child at `index`, if there is one.
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Node>> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl FromIterator<Box<dyn Node>> for Group {
    fn from_iter<I: IntoIterator<Item = Box<dyn Node>>>(iter: I) -> Self {
        Self {
            children: iter.into_iter().collect(),
        }
    }
}

impl Node for Group {
    fn kind(&self) -> NodeKind {
        NodeKind::Group
    }

    fn children(&self) -> &[Box<dyn Node>] {
        &self.children
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Box<dyn Node>>> {
        Some(&mut self.children)
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        self.children
            .iter_mut()
            .try_for_each(|child| child.alloc(allocator))
    }

    fn resize(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        self.children
            .iter_mut()
            .try_for_each(|child| child.resize(allocator))
    }

    fn stage(&mut self, stager: &mut Stager<'_>) -> Result<(), SceneError> {
        self.children
            .iter_mut()
            .try_for_each(|child| child.stage(stager))
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        self.children
            .iter_mut()
            .try_for_each(|child| child.pipeline(creator))
    }

    fn record(&mut self, recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        self.children
            .iter_mut()
            .try_for_each(|child| child.record(recorder))
    }

    fn render(&mut self, renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        self.children
            .iter_mut()
            .try_for_each(|child| child.render(renderer))
    }

    fn present(&mut self, presenter: &mut Presenter<'_>) -> Result<(), SceneError> {
        self.children
            .iter_mut()
            .try_for_each(|child| child.present(presenter))
    }

    fn handle_event(&mut self, handler: &mut EventHandler<'_>) -> Result<(), SceneError> {
        self.children
            .iter_mut()
            .try_for_each(|child| child.handle_event(handler))
    }

    fn bounding_box(&self, query: &mut BoundingBoxQuery) {
        for child in &self.children {
            child.bounding_box(query);
        }
    }
}

typed_node!(Group, Group);

/// A [`Group`] that scopes state.
///
/// Before visiting its children the separator saves the state record of the
/// current context; afterwards it restores it, whether or not a child failed.
/// Nothing a child writes is visible to the separator's later siblings.
#[derive(Debug, Default)]
pub struct Separator {
    group: Group,
}

impl Separator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, child: impl Node + 'static) -> Self {
        self.group.push(child);
        self
    }

    pub fn push(&mut self, child: impl Node + 'static) {
        self.group.push(child);
    }

    pub fn push_boxed(&mut self, child: Box<dyn Node>) {
        self.group.push_boxed(child);
    }

    pub fn insert(&mut self, index: usize, child: Box<dyn Node>) {
        self.group.insert(index, child);
    }

    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Node>> {
        self.group.remove(index)
    }

    pub fn len(&self) -> usize {
        self.group.len()
    }

    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }
}

impl From<Group> for Separator {
    fn from(group: Group) -> Self {
        Self { group }
    }
}

impl Node for Separator {
    fn kind(&self) -> NodeKind {
        NodeKind::Separator
    }

    fn children(&self) -> &[Box<dyn Node>] {
        self.group.children()
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Box<dyn Node>>> {
        self.group.children_mut()
    }

    fn alloc(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        scoped(allocator, |allocator| self.group.alloc(allocator))
    }

    fn resize(&mut self, allocator: &mut Allocator<'_>) -> Result<(), SceneError> {
        scoped(allocator, |allocator| self.group.resize(allocator))
    }

    fn stage(&mut self, stager: &mut Stager<'_>) -> Result<(), SceneError> {
        scoped(stager, |stager| self.group.stage(stager))
    }

    fn pipeline(&mut self, creator: &mut PipelineCreator<'_>) -> Result<(), SceneError> {
        scoped(creator, |creator| self.group.pipeline(creator))
    }

    fn record(&mut self, recorder: &mut CommandRecorder<'_>) -> Result<(), SceneError> {
        scoped(recorder, |recorder| self.group.record(recorder))
    }

    fn render(&mut self, renderer: &mut SceneRenderer<'_>) -> Result<(), SceneError> {
        scoped(renderer, |renderer| self.group.render(renderer))
    }

    fn present(&mut self, presenter: &mut Presenter<'_>) -> Result<(), SceneError> {
        scoped(presenter, |presenter| self.group.present(presenter))
    }

    fn handle_event(&mut self, handler: &mut EventHandler<'_>) -> Result<(), SceneError> {
        self.group.handle_event(handler)
    }

    fn bounding_box(&self, query: &mut BoundingBoxQuery) {
        scoped(query, |query| self.group.bounding_box(query));
    }
}

typed_node!(Separator, Separator);
