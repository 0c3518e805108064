//! [`Netlist`]: the flattened, post-elaboration design and its graph queries.

use crate::arena::Arena;
use crate::cell::{Cell, CellOp};
use crate::ids::{CellId, NetId};
use crate::net::Net;
use aion_common::Ident;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graphmap::DiGraphMap;
use std::collections::{HashSet, VecDeque};

/// Returns `true` if a cell of this operation is a state-holding element
/// (spec §4.3.6: sequential cells break combinational-cycle detection).
fn is_sequential(op: CellOp) -> bool {
    matches!(
        op,
        CellOp::Dff | CellOp::Dffr | CellOp::Dffe | CellOp::Latch | CellOp::Memrd | CellOp::Memwr
    )
}

/// The flattened netlist of one elaborated top module (spec §3.3, §4.4).
#[derive(Debug, Clone)]
pub struct Netlist {
    /// The name of the top-level module this netlist was elaborated from.
    pub top_name: Ident,
    /// All cells, keyed by [`CellId`].
    pub cells: Arena<CellId, Cell>,
    /// All nets, keyed by [`NetId`].
    pub nets: Arena<NetId, Net>,
}

impl Netlist {
    /// Creates a new, empty netlist for the given top module name.
    pub fn new(top_name: Ident) -> Self {
        Self {
            top_name,
            cells: Arena::new(),
            nets: Arena::new(),
        }
    }

    /// Returns the cell IDs that directly drive `cell`'s input pins
    /// (one-hop fan-in, spec §4.4).
    pub fn fanin(&self, cell: CellId) -> Vec<CellId> {
        let mut out = Vec::new();
        for (_, pin) in &self.cells.get(cell).pins {
            if let Some(net_id) = pin.net {
                if let Some((driver, _)) = &self.nets.get(net_id).driver {
                    out.push(*driver);
                }
            }
        }
        out
    }

    /// Returns the cell IDs that directly consume a net driven by `cell`
    /// (one-hop fan-out, spec §4.4).
    pub fn fanout(&self, cell: CellId) -> Vec<CellId> {
        let mut out = Vec::new();
        for (_, pin) in &self.cells.get(cell).pins {
            if let Some(net_id) = pin.net {
                for (sink, _) in &self.nets.get(net_id).sinks {
                    out.push(*sink);
                }
            }
        }
        out
    }

    /// Returns the full set of cells transitively reachable backward from
    /// `cell` through driver edges (spec §4.4 "transitive fan-in cone").
    pub fn transitive_fanin(&self, cell: CellId) -> HashSet<CellId> {
        self.bfs_cone(cell, |c| self.fanin(c))
    }

    /// Returns the full set of cells transitively reachable forward from
    /// `cell` through sink edges (spec §4.4 "transitive fan-out cone").
    pub fn transitive_fanout(&self, cell: CellId) -> HashSet<CellId> {
        self.bfs_cone(cell, |c| self.fanout(c))
    }

    fn bfs_cone(&self, start: CellId, neighbors: impl Fn(CellId) -> Vec<CellId>) -> HashSet<CellId> {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start);
        seen.insert(start);
        while let Some(cell) = queue.pop_front() {
            for next in neighbors(cell) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen.remove(&start);
        seen
    }

    /// Builds a directed graph over the non-sequential subgraph: an edge
    /// `driver -> sink` for every net whose driver and at least one sink
    /// are both combinational cells. Sequential cells (`DFF`, `DFFR`,
    /// `DFFE`, `LATCH`, `MEMRD`, `MEMWR`) are omitted — they are the
    /// natural break points for both topological sort and cycle detection
    /// (spec §4.3.6, §4.4).
    fn combinational_graph(&self) -> DiGraphMap<CellId, ()> {
        let mut graph = DiGraphMap::new();
        for (id, cell) in self.cells.iter() {
            if !is_sequential(cell.op) {
                graph.add_node(id);
            }
        }
        for (_, net) in self.nets.iter() {
            let Some((driver, _)) = &net.driver else {
                continue;
            };
            if is_sequential(self.cells.get(*driver).op) {
                continue;
            }
            for (sink, _) in &net.sinks {
                if !is_sequential(self.cells.get(*sink).op) {
                    graph.add_edge(*driver, *sink, ());
                }
            }
        }
        graph
    }

    /// Returns a topological order of the combinational subgraph, or the
    /// cell IDs forming a cycle if the subgraph is not a DAG (spec §4.4).
    pub fn topological_sort(&self) -> Result<Vec<CellId>, Vec<CellId>> {
        let graph = self.combinational_graph();
        match toposort(&graph, None) {
            Ok(order) => Ok(order),
            Err(cycle) => Err(self.cycle_containing(cycle.node_id())),
        }
    }

    fn cycle_containing(&self, node: CellId) -> Vec<CellId> {
        self.find_combinational_cycles()
            .into_iter()
            .find(|scc| scc.contains(&node))
            .unwrap_or_else(|| vec![node])
    }

    /// Finds every combinational (feedback-through-gates-only) cycle in the
    /// netlist using Tarjan's strongly-connected-components algorithm
    /// (spec §4.3.6 "detect combinational cycles"). Only SCCs with more
    /// than one member, or a single self-looping cell, are true cycles.
    pub fn find_combinational_cycles(&self) -> Vec<Vec<CellId>> {
        let graph = self.combinational_graph();
        tarjan_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .collect()
    }

    /// Removes every cell and net not transitively reachable backward from
    /// a `MODULE_OUTPUT` cell's driving pin (spec §4.4 "dead-cell
    /// elimination"). Does not renumber IDs; call [`Netlist::reset_ids`]
    /// afterward to compact them.
    pub fn remove_dead_cells(&mut self) {
        let mut live = HashSet::new();
        for (id, cell) in self.cells.iter() {
            if cell.op == CellOp::ModuleOutput {
                live.insert(id);
                live.extend(self.transitive_fanin(id));
            }
        }
        let dead_nets: HashSet<NetId> = self
            .nets
            .iter()
            .filter(|(_, net)| {
                let driver_dead = net
                    .driver
                    .as_ref()
                    .map(|(c, _)| !live.contains(c))
                    .unwrap_or(true);
                let no_live_sink = net.sinks.iter().all(|(c, _)| !live.contains(c));
                driver_dead && no_live_sink
            })
            .map(|(id, _)| id)
            .collect();

        let live_cells: Vec<Cell> = self
            .cells
            .iter()
            .filter(|(id, _)| live.contains(id))
            .map(|(_, c)| c.clone())
            .collect();
        let live_nets: Vec<Net> = self
            .nets
            .iter()
            .filter(|(id, _)| !dead_nets.contains(id))
            .map(|(_, n)| n.clone())
            .collect();

        self.cells = Arena::new();
        for cell in live_cells {
            self.cells.alloc(cell);
        }
        self.nets = Arena::new();
        for net in live_nets {
            self.nets.alloc(net);
        }
        self.reset_ids();
    }

    /// Renumbers every cell and net to a dense `0..len` range in allocation
    /// order, fixing up every pin/driver/sink reference that pointed at the
    /// old IDs (spec §5: "IDs are renumbered densely after any pass that
    /// removes cells or nets").
    pub fn reset_ids(&mut self) {
        let old_cells: Vec<(CellId, Cell)> = self.cells.iter().map(|(id, c)| (id, c.clone())).collect();
        let old_nets: Vec<(NetId, Net)> = self.nets.iter().map(|(id, n)| (id, n.clone())).collect();

        let cell_map: std::collections::HashMap<CellId, CellId> = old_cells
            .iter()
            .enumerate()
            .map(|(i, (old, _))| (*old, CellId::from_raw(i as u32)))
            .collect();
        let net_map: std::collections::HashMap<NetId, NetId> = old_nets
            .iter()
            .enumerate()
            .map(|(i, (old, _))| (*old, NetId::from_raw(i as u32)))
            .collect();

        let mut new_cells = Arena::new();
        for (old_id, mut cell) in old_cells {
            cell.id = cell_map[&old_id];
            for pin in cell.pins.values_mut() {
                pin.cell = cell_map[&old_id];
                pin.net = pin.net.and_then(|n| net_map.get(&n).copied());
            }
            new_cells.alloc(cell);
        }

        let mut new_nets = Arena::new();
        for (old_id, mut net) in old_nets {
            net.id = net_map[&old_id];
            net.driver = net
                .driver
                .and_then(|(c, p)| cell_map.get(&c).map(|nc| (*nc, p)));
            net.sinks = net
                .sinks
                .into_iter()
                .filter_map(|(c, p)| cell_map.get(&c).map(|nc| (*nc, p)))
                .collect();
            let _ = old_id;
            new_nets.alloc(net);
        }

        self.cells = new_cells;
        self.nets = new_nets;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::PinDirection;
    use aion_common::Interner;
    use aion_source::Span;

    fn wire(netlist: &mut Netlist, interner: &Interner, name: &str, width: u32) -> NetId {
        netlist.nets.alloc(Net::new(NetId::from_raw(0), interner.get_or_intern(name), width))
    }

    /// Builds `in -> NOT -> out`, connecting nets by hand the way the
    /// elaborator does once pins exist.
    fn linear_not_chain() -> Netlist {
        let interner = Interner::new();
        let mut nl = Netlist::new(interner.get_or_intern("top"));

        let in_cell = nl.cells.alloc(Cell::new(
            CellId::from_raw(0),
            interner.get_or_intern("in"),
            CellOp::ModuleInput,
            Span::DUMMY,
        ));
        let not_cell = nl.cells.alloc(Cell::new(
            CellId::from_raw(0),
            interner.get_or_intern("g1"),
            CellOp::Not,
            Span::DUMMY,
        ));
        let out_cell = nl.cells.alloc(Cell::new(
            CellId::from_raw(0),
            interner.get_or_intern("out"),
            CellOp::ModuleOutput,
            Span::DUMMY,
        ));

        nl.cells.get_mut(in_cell).add_pin("Y", PinDirection::Out, 1);
        nl.cells.get_mut(not_cell).add_pin("A", PinDirection::In, 1);
        nl.cells.get_mut(not_cell).add_pin("Y", PinDirection::Out, 1);
        nl.cells.get_mut(out_cell).add_pin("A", PinDirection::In, 1);

        let n1 = wire(&mut nl, &interner, "n1", 1);
        let n2 = wire(&mut nl, &interner, "n2", 1);

        nl.nets.get_mut(n1).set_driver(in_cell, "Y");
        nl.nets.get_mut(n1).add_sink(not_cell, "A");
        nl.cells.get_mut(in_cell).pin_mut("Y").unwrap().net = Some(n1);
        nl.cells.get_mut(not_cell).pin_mut("A").unwrap().net = Some(n1);

        nl.nets.get_mut(n2).set_driver(not_cell, "Y");
        nl.nets.get_mut(n2).add_sink(out_cell, "A");
        nl.cells.get_mut(not_cell).pin_mut("Y").unwrap().net = Some(n2);
        nl.cells.get_mut(out_cell).pin_mut("A").unwrap().net = Some(n2);

        nl
    }

    #[test]
    fn fanin_fanout_one_hop() {
        let nl = linear_not_chain();
        let not_id = CellId::from_raw(1);
        assert_eq!(nl.fanin(not_id), vec![CellId::from_raw(0)]);
        assert_eq!(nl.fanout(not_id), vec![CellId::from_raw(2)]);
    }

    #[test]
    fn transitive_cones() {
        let nl = linear_not_chain();
        let out_id = CellId::from_raw(2);
        let cone = nl.transitive_fanin(out_id);
        assert!(cone.contains(&CellId::from_raw(0)));
        assert!(cone.contains(&CellId::from_raw(1)));
    }

    #[test]
    fn topological_sort_acyclic() {
        let nl = linear_not_chain();
        let order = nl.topological_sort().unwrap();
        let pos = |id: CellId| order.iter().position(|&c| c == id).unwrap();
        assert!(pos(CellId::from_raw(0)) < pos(CellId::from_raw(1)));
        assert!(pos(CellId::from_raw(1)) < pos(CellId::from_raw(2)));
    }

    #[test]
    fn detects_combinational_self_loop() {
        let interner = Interner::new();
        let mut nl = Netlist::new(interner.get_or_intern("top"));
        let and_cell = nl.cells.alloc(Cell::new(
            CellId::from_raw(0),
            interner.get_or_intern("g1"),
            CellOp::And,
            Span::DUMMY,
        ));
        nl.cells.get_mut(and_cell).add_pin("A", PinDirection::In, 1);
        nl.cells.get_mut(and_cell).add_pin("Y", PinDirection::Out, 1);
        let n1 = wire(&mut nl, &interner, "n1", 1);
        nl.nets.get_mut(n1).set_driver(and_cell, "Y");
        nl.nets.get_mut(n1).add_sink(and_cell, "A");
        nl.cells.get_mut(and_cell).pin_mut("A").unwrap().net = Some(n1);
        nl.cells.get_mut(and_cell).pin_mut("Y").unwrap().net = Some(n1);

        assert!(nl.topological_sort().is_err());
        assert_eq!(nl.find_combinational_cycles().len(), 1);
    }

    #[test]
    fn dff_breaks_cycle_detection() {
        let interner = Interner::new();
        let mut nl = Netlist::new(interner.get_or_intern("top"));
        let dff = nl.cells.alloc(Cell::new(
            CellId::from_raw(0),
            interner.get_or_intern("ff"),
            CellOp::Dff,
            Span::DUMMY,
        ));
        nl.cells.get_mut(dff).add_pin("D", PinDirection::In, 1);
        nl.cells.get_mut(dff).add_pin("Q", PinDirection::Out, 1);
        let n1 = wire(&mut nl, &interner, "n1", 1);
        nl.nets.get_mut(n1).set_driver(dff, "Q");
        nl.nets.get_mut(n1).add_sink(dff, "D");
        nl.cells.get_mut(dff).pin_mut("D").unwrap().net = Some(n1);
        nl.cells.get_mut(dff).pin_mut("Q").unwrap().net = Some(n1);

        assert!(nl.find_combinational_cycles().is_empty());
        assert!(nl.topological_sort().is_ok());
    }

    #[test]
    fn remove_dead_cells_drops_unreachable() {
        let mut nl = linear_not_chain();
        let interner = Interner::new();
        let orphan = nl.cells.alloc(Cell::new(
            CellId::from_raw(0),
            interner.get_or_intern("dead"),
            CellOp::Const,
            Span::DUMMY,
        ));
        let _ = orphan;
        assert_eq!(nl.cells.len(), 4);
        nl.remove_dead_cells();
        assert_eq!(nl.cells.len(), 3);
    }

    #[test]
    fn reset_ids_is_dense() {
        let mut nl = linear_not_chain();
        nl.reset_ids();
        let ids: Vec<u32> = nl.cells.iter().map(|(id, _)| id.as_raw()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
